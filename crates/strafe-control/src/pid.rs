//! PID Controller - 比例-积分-微分控制器
//!
//! 固定周期的单环 PID，用于把电机编码器读数驱动到目标值。
//!
//! # 算法
//!
//! ```text
//! proportion = target - input
//! integral  += proportion        （|proportion| <= leveling_error 时归零，随后钳位到 ±windup_limit）
//! derivative = proportion - past_error
//! output     = clamp(kp * proportion + ki * integral + kd * derivative, min, max)
//! ```
//!
//! # 时间假设
//!
//! 本实现 **不** 按实际经过时间缩放积分项和微分项，调用方必须以恒定周期调用
//! [`PidController::update`]。调度周期抖动会让 I/D 项偏离整定值，这是已知限制：
//! 引入 `dt` 缩放会改变已整定增益的含义，因此保持不变。
//!
//! # 示例
//!
//! ```rust
//! use strafe_control::{PidController, PidProfile};
//!
//! let profile = PidProfile::new(1.0, 0.0, 0.0);
//! let mut pid = PidController::new(-127.0, 127.0, profile).unwrap();
//!
//! pid.set_target(100.0);
//! assert_eq!(pid.update(0.0).unwrap(), 100.0);
//!
//! pid.set_target(200.0);
//! assert_eq!(pid.update(0.0).unwrap(), 127.0); // 输出被钳位
//! ```

use crate::error::ControlError;

/// PID 整定参数
///
/// 不可变值类型，按值拷贝进控制器，不存在共享可变状态。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidProfile {
    /// 比例增益 (Kp)
    pub kp: f64,
    /// 积分增益 (Ki)
    pub ki: f64,
    /// 微分增益 (Kd)
    pub kd: f64,
    /// 积分项绝对值上限（防止积分饱和）
    ///
    /// 默认为正无穷，即不限制。
    #[cfg_attr(feature = "serde", serde(default = "default_windup_limit"))]
    pub integral_windup_limit: f64,
    /// 积分归零阈值
    ///
    /// 当误差绝对值不超过该值时，累积的积分项被清零，避免在目标附近缓慢爬行。
    #[cfg_attr(feature = "serde", serde(default))]
    pub integral_leveling_error: f64,
}

#[cfg(feature = "serde")]
fn default_windup_limit() -> f64 {
    f64::INFINITY
}

impl PidProfile {
    /// 创建只包含增益的参数（无积分上限，归零阈值为 0）
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_windup_limit: f64::INFINITY,
            integral_leveling_error: 0.0,
        }
    }

    /// 设置积分项上限
    pub const fn with_windup_limit(mut self, limit: f64) -> Self {
        self.integral_windup_limit = limit;
        self
    }

    /// 设置积分归零阈值
    pub const fn with_leveling_error(mut self, error: f64) -> Self {
        self.integral_leveling_error = error;
        self
    }

    /// 校验参数
    ///
    /// # 错误
    ///
    /// - 增益为 NaN、无穷或负数
    /// - 积分上限为 NaN 或负数（允许正无穷）
    /// - 归零阈值为 NaN、无穷或负数
    pub fn validate(&self) -> Result<(), ControlError> {
        for (name, gain) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ControlError::InvalidProfile(format!(
                    "{name} must be finite and non-negative, got {gain}"
                )));
            }
        }
        if self.integral_windup_limit.is_nan() || self.integral_windup_limit < 0.0 {
            return Err(ControlError::InvalidProfile(format!(
                "integral_windup_limit must be non-negative, got {}",
                self.integral_windup_limit
            )));
        }
        if !self.integral_leveling_error.is_finite() || self.integral_leveling_error < 0.0 {
            return Err(ControlError::InvalidProfile(format!(
                "integral_leveling_error must be finite and non-negative, got {}",
                self.integral_leveling_error
            )));
        }
        Ok(())
    }
}

impl Default for PidProfile {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// PID 控制器
///
/// 持有参数、输出区间、目标值（可能未设置）以及运行时累积项。
///
/// # 不变量
///
/// 每次 [`update`](Self::update) 之后：
/// - `|integral| <= profile.integral_windup_limit`
/// - 输出位于 `[min, max]`
#[derive(Debug, Clone)]
pub struct PidController {
    profile: PidProfile,
    min: f64,
    max: f64,
    /// `None` 表示目标从未被设置，与任何数值都不同
    target: Option<f64>,

    integral: f64,
    past_error: f64,
}

fn check_range(min: f64, max: f64) -> Result<(), ControlError> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(ControlError::InvalidRange { min, max });
    }
    Ok(())
}

impl PidController {
    /// 创建新的 PID 控制器
    ///
    /// # 参数
    ///
    /// - `min`/`max`: 输出区间
    /// - `profile`: 整定参数
    ///
    /// # 错误
    ///
    /// - `ControlError::InvalidRange`: `min > max` 或包含 NaN
    /// - `ControlError::InvalidProfile`: 参数校验失败
    pub fn new(min: f64, max: f64, profile: PidProfile) -> Result<Self, ControlError> {
        check_range(min, max)?;
        profile.validate()?;
        Ok(Self {
            profile,
            min,
            max,
            target: None,
            integral: 0.0,
            past_error: 0.0,
        })
    }

    /// 设置目标值（不做范围检查）
    pub fn set_target(&mut self, target: f64) {
        self.target = Some(target);
    }

    /// 替换输出区间，下一次 `update` 生效
    pub fn set_range(&mut self, min: f64, max: f64) -> Result<(), ControlError> {
        check_range(min, max)?;
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// 替换整定参数，下一次 `update` 生效
    ///
    /// 累积项保持不变。
    pub fn set_profile(&mut self, profile: PidProfile) -> Result<(), ControlError> {
        profile.validate()?;
        self.profile = profile;
        Ok(())
    }

    /// 获取目标值
    ///
    /// # 错误
    ///
    /// 目标从未设置时返回 `ControlError::TargetNotSet`。
    pub fn target(&self) -> Result<f64, ControlError> {
        self.target.ok_or(ControlError::TargetNotSet)
    }

    /// 目标值是否已设置
    pub fn is_target_set(&self) -> bool {
        self.target.is_some()
    }

    /// 当前整定参数
    pub fn profile(&self) -> PidProfile {
        self.profile
    }

    /// 当前输出区间 `(min, max)`
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// 当前积分项
    ///
    /// 用于调试和监控。
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// 上一次的误差
    pub fn past_error(&self) -> f64 {
        self.past_error
    }

    /// 判断输入是否在目标的误差范围内
    ///
    /// 当且仅当 `|input - target| < error` 时返回 true。目标未设置时返回 false。
    pub fn within_error(&self, input: f64, error: f64) -> bool {
        match self.target {
            Some(target) => (input - target).abs() < error,
            None => false,
        }
    }

    /// 清零累积项（保留目标、参数和区间）
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.past_error = 0.0;
    }

    /// 执行一次 PID 更新
    ///
    /// 必须以恒定周期调用。
    ///
    /// # 错误
    ///
    /// 目标从未设置时返回 `ControlError::TargetNotSet`，此时不修改任何状态。
    pub fn update(&mut self, input: f64) -> Result<f64, ControlError> {
        let target = self.target.ok_or(ControlError::TargetNotSet)?;

        // 1. 比例项
        let proportion = target - input;

        // 2. 积分项：接近目标时归零，然后钳位
        let mut integral = self.integral + proportion;
        if proportion.abs() <= self.profile.integral_leveling_error {
            integral = 0.0;
        }
        let limit = self.profile.integral_windup_limit;
        integral = integral.clamp(-limit, limit);

        // 3. 微分项
        let derivative = proportion - self.past_error;

        self.integral = integral;
        self.past_error = proportion;

        let output = self.profile.kp * proportion
            + self.profile.ki * integral
            + self.profile.kd * derivative;

        Ok(output.clamp(self.min, self.max))
    }
}
