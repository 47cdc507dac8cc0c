//! 斜率限制（Slew Limiting）
//!
//! 限制每个控制周期内指令输出的变化量，保护传动系统（皮带、齿轮）不受突加速冲击。
//!
//! - [`step`]: 对称限制，向目标移动至多 `max_step`
//! - [`slew_step`]: 方向感知版本，**只限制加速**：当新目标与当前值同号且幅值更小时
//!   （同向减速），立即返回目标值，不受 `max_step` 约束
//!
//! 减速方向不做限制是刻意的机械安全策略：加速冲击才会损伤传动系统，向零减速总是安全的。
//!
//! # 示例
//!
//! ```rust
//! use strafe_control::slew::{slew_step, step};
//!
//! assert_eq!(step(0.0, 10.0, 100.0), 10.0);
//! assert_eq!(step(95.0, 10.0, 100.0), 100.0);
//!
//! // 同向减速：立即到位
//! assert_eq!(slew_step(100.0, 10.0, 20.0), 20.0);
//! // 加速：受限
//! assert_eq!(slew_step(20.0, 10.0, 100.0), 30.0);
//! ```

/// 向目标移动至多 `max_step`
///
/// 若 `|current - target| <= max_step`，直接返回 `target`；否则向 `target` 方向移动恰好 `max_step`。
#[inline]
pub fn step(current: f64, max_step: f64, target: f64) -> f64 {
    if (current - target).abs() <= max_step {
        return target;
    }
    if current > target {
        current - max_step
    } else {
        current + max_step
    }
}

/// 方向感知的斜率限制
///
/// 与 [`step`] 相同，但当 `target` 与 `current` 严格同号且 `|target| < |current|` 时
/// 直接返回 `target`。目标为 0 不属于同号，仍按 `max_step` 逐步逼近。
#[inline]
pub fn slew_step(current: f64, max_step: f64, target: f64) -> f64 {
    if (current - target).abs() <= max_step {
        return target;
    }

    let decelerating = target.abs() < current.abs();
    let same_sign = (target < 0.0 && current < 0.0) || (target > 0.0 && current > 0.0);
    if decelerating && same_sign {
        return target;
    }

    step(current, max_step, target)
}

/// 有状态的斜率限制器
///
/// 记住上一次的输出，每次调用 [`next`](Self::next) 使用 [`slew_step`] 逼近新目标。
/// 由拥有它的控制循环独占使用。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewLimiter {
    max_step: f64,
    current: f64,
}

impl SlewLimiter {
    /// 创建限制器，初始输出为 0
    pub const fn new(max_step: f64) -> Self {
        Self {
            max_step,
            current: 0.0,
        }
    }

    /// 每周期允许的最大变化量
    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    /// 上一次输出
    pub fn current(&self) -> f64 {
        self.current
    }

    /// 计算并记录下一次输出
    pub fn next(&mut self, target: f64) -> f64 {
        self.current = slew_step(self.current, self.max_step, target);
        self.current
    }

    /// 将上一次输出强制设为给定值（例如执行器被外部停止后）
    pub fn reset_to(&mut self, value: f64) {
        self.current = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_step_reaches_target_on_tenth_call() {
        let mut value = 0.0;
        for i in 1..=10 {
            value = step(value, 10.0, 100.0);
            if i < 10 {
                assert!(value < 100.0, "reached target early at call {i}");
            }
        }
        assert_eq!(value, 100.0);
    }

    #[test]
    fn test_step_downward() {
        assert_eq!(step(50.0, 20.0, -50.0), 30.0);
        assert_eq!(step(-35.0, 20.0, -50.0), -50.0);
    }

    #[test]
    fn test_slew_step_decelerates_immediately() {
        assert_eq!(slew_step(100.0, 10.0, 20.0), 20.0);
        assert_eq!(slew_step(-100.0, 10.0, -5.0), -5.0);
    }

    #[test]
    fn test_slew_step_limits_acceleration() {
        assert_eq!(slew_step(20.0, 10.0, 100.0), 30.0);
        assert_eq!(slew_step(-20.0, 10.0, -100.0), -30.0);
    }

    #[test]
    fn test_slew_step_reversal_is_limited() {
        // 反向（异号）不属于同向减速
        assert_eq!(slew_step(100.0, 10.0, -100.0), 90.0);
        // 目标为 0 没有符号，逐步逼近
        assert_eq!(slew_step(100.0, 10.0, 0.0), 90.0);
    }

    #[test]
    fn test_slew_limiter_tracks_output() {
        let mut limiter = SlewLimiter::new(25.0);
        assert_eq!(limiter.next(100.0), 25.0);
        assert_eq!(limiter.next(100.0), 50.0);
        assert_eq!(limiter.next(10.0), 10.0);
        assert_eq!(limiter.current(), 10.0);

        limiter.reset_to(0.0);
        assert_eq!(limiter.next(-100.0), -25.0);
    }

    proptest! {
        /// 距离在步长内则直接到位，否则恰好移动一个步长
        #[test]
        fn step_is_exact(
            current in -1000.0..1000.0f64,
            max_step in 0.001..200.0f64,
            target in -1000.0..1000.0f64,
        ) {
            let next = step(current, max_step, target);
            if (current - target).abs() <= max_step {
                prop_assert_eq!(next, target);
            } else {
                prop_assert!(((next - current).abs() - max_step).abs() < 1e-9);
                prop_assert!((target - next).abs() < (target - current).abs());
            }
        }

        /// 同号且幅值变小时忽略步长
        #[test]
        fn slew_step_snaps_on_same_sign_deceleration(
            current in 1.0..1000.0f64,
            fraction in 0.0..0.999f64,
            max_step in 0.0..10.0f64,
            negative in any::<bool>(),
        ) {
            let sign = if negative { -1.0 } else { 1.0 };
            let current = current * sign;
            let target = current * fraction;
            prop_assume!(target != 0.0);
            prop_assert_eq!(slew_step(current, max_step, target), target);
        }
    }
}
