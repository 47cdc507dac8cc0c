//! 调度器性能指标
//!
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会和调度线程产生锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 调度器实时指标
///
/// # 使用示例
///
/// ```rust
/// use strafe_driver::SchedulerMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = SchedulerMetrics::default();
/// metrics.ticks_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.ticks_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// 已完成的调度周期数
    pub ticks_total: AtomicU64,

    /// 成功完成的电机更新次数
    pub motor_updates_total: AtomicU64,

    /// 电机更新失败次数（执行器错误等）
    pub update_errors: AtomicU64,

    /// 周期超时次数
    ///
    /// 一个周期内所有电机更新的耗时超过调度周期。如果这个值快速增长，
    /// 说明某个执行器的调用在阻塞。
    pub tick_overruns: AtomicU64,
}

impl SchedulerMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> SchedulerMetricsSnapshot {
        SchedulerMetricsSnapshot {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            motor_updates_total: self.motor_updates_total.load(Ordering::Relaxed),
            update_errors: self.update_errors.load(Ordering::Relaxed),
            tick_overruns: self.tick_overruns.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.ticks_total.store(0, Ordering::Relaxed);
        self.motor_updates_total.store(0, Ordering::Relaxed);
        self.update_errors.store(0, Ordering::Relaxed);
        self.tick_overruns.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerMetricsSnapshot {
    /// 已完成的调度周期数
    pub ticks_total: u64,
    /// 成功完成的电机更新次数
    pub motor_updates_total: u64,
    /// 电机更新失败次数
    pub update_errors: u64,
    /// 周期超时次数
    pub tick_overruns: u64,
}

impl SchedulerMetricsSnapshot {
    /// 周期超时比例（百分比）
    ///
    /// `ticks_total` 为 0 时返回 0.0。
    pub fn overrun_rate(&self) -> f64 {
        if self.ticks_total == 0 {
            return 0.0;
        }
        (self.tick_overruns as f64 / self.ticks_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = SchedulerMetrics::new();
        metrics.ticks_total.fetch_add(4, Ordering::Relaxed);
        metrics.tick_overruns.fetch_add(1, Ordering::Relaxed);
        metrics.motor_updates_total.fetch_add(16, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks_total, 4);
        assert_eq!(snapshot.motor_updates_total, 16);
        assert_eq!(snapshot.overrun_rate(), 25.0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), SchedulerMetricsSnapshot::default());
    }

    #[test]
    fn test_overrun_rate_empty() {
        assert_eq!(SchedulerMetricsSnapshot::default().overrun_rate(), 0.0);
    }
}
