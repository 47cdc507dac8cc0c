//! 底盘运动状态

use std::sync::atomic::{AtomicU8, Ordering};

/// 底盘运动状态机
///
/// ```text
///            forward/turn/strafe
///   Idle ───────────────────────► Moving
///    ▲                            │    │
///    │ swerve/stop/rebuild        │    │ 超时
///    │                   全部到位 ▼    ▼
///    └──────────────────── Settled   Stalled
/// ```
///
/// `Stalled` 对于该条指令是终态，调用方需要重新下发指令。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChassisState {
    /// 无停转监测（空闲或驾驶模式）
    #[default]
    Idle = 0,
    /// 已下发位置指令，停转计时中
    Moving = 1,
    /// 所有轮子进入误差范围
    Settled = 2,
    /// 超时未到位，已停止
    Stalled = 3,
}

impl ChassisState {
    /// 从 u8 转换
    ///
    /// 无效值返回 Idle。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Moving,
            2 => Self::Settled,
            3 => Self::Stalled,
            _ => Self::Idle,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// `StallUntilSettled` 的结果
///
/// 停转不是错误，而是调用方需要处理的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallOutcome {
    /// 所有轮子在超时前到位
    Settled,
    /// 超时，底盘已停止
    Stalled,
    /// 等待期间底盘被重建，旧指令作废
    Abandoned,
}

/// 底盘状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicChassisState {
    inner: AtomicU8,
}

impl AtomicChassisState {
    /// 创建新的原子状态
    pub fn new(state: ChassisState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self, ordering: Ordering) -> ChassisState {
        ChassisState::from_u8(self.inner.load(ordering))
    }

    /// 设置状态
    pub fn set(&self, state: ChassisState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }

    /// 比较并交换
    ///
    /// 当前值等于 `current` 时设置为 `new` 并返回 true。
    pub fn compare_exchange(
        &self,
        current: ChassisState,
        new: ChassisState,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), success, failure)
            .is_ok()
    }
}

impl Default for AtomicChassisState {
    fn default() -> Self {
        Self::new(ChassisState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        for state in [
            ChassisState::Idle,
            ChassisState::Moving,
            ChassisState::Settled,
            ChassisState::Stalled,
        ] {
            assert_eq!(ChassisState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ChassisState::from_u8(200), ChassisState::Idle);
    }

    #[test]
    fn test_atomic_state() {
        let state = AtomicChassisState::default();
        assert_eq!(state.get(Ordering::Relaxed), ChassisState::Idle);

        state.set(ChassisState::Moving, Ordering::Relaxed);
        assert_eq!(state.get(Ordering::Relaxed), ChassisState::Moving);

        assert!(state.compare_exchange(
            ChassisState::Moving,
            ChassisState::Settled,
            Ordering::Relaxed,
            Ordering::Relaxed
        ));
        // 期望值不匹配
        assert!(!state.compare_exchange(
            ChassisState::Moving,
            ChassisState::Stalled,
            Ordering::Relaxed,
            Ordering::Relaxed
        ));
        assert_eq!(state.get(Ordering::Relaxed), ChassisState::Settled);
    }
}
