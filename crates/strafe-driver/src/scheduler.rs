//! 后台调度器
//!
//! 以固定周期对所有已注册电机调用一次 `update()`。
//!
//! # 注册表设计
//!
//! 注册表是一个按句柄索引的槽位数组（arena）：
//! - `enroll()` 返回 [`MotorHandle`]（槽位索引 + 代数），`remove()` 接收句柄
//! - 槽位只保存 `Weak` 引用，调度器从不拥有电机的生命周期
//! - 槽位被复用时代数递增，过期句柄不会误删新电机
//!
//! # 并发契约
//!
//! - 每个周期在持有注册表锁的情况下按注册顺序遍历所有存活句柄
//! - `remove()` 需要同一把锁，因此返回时不存在正在进行的、针对该电机的更新，
//!   之后也不会再有任何更新
//! - `update()` 必须是非阻塞的：一个慢电机会推迟同周期内的所有其他电机
//!
//! ```text
//! ┌──────────────────────┐      enroll / remove       ┌────────────────┐
//! │  BackgroundScheduler │ ◄───────────────────────── │ ControlledMotor│
//! ├──────────────────────┤                            └────────────────┘
//! │ registry (Mutex)     │ ← slots: [Weak<dyn ScheduledMotor>; N]
//! │ metrics  (atomics)   │
//! │ tick thread          │ → 每周期 update() 一次
//! └──────────────────────┘
//! ```

use crate::config::SchedulerConfig;
use crate::error::DriverError;
use crate::metrics::SchedulerMetrics;
use crate::port::Port;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 可被调度器驱动的电机
///
/// # 性能要求
///
/// - **非阻塞**: `update()` 在调度线程中执行，必须尽快返回
/// - 错误只会被记录和计数，不会中断其他电机的更新
pub trait ScheduledMotor: Send + Sync {
    /// 执行一次控制更新（仅由调度线程调用）
    fn update(&self) -> Result<(), DriverError>;

    /// 电机端口（用于日志）
    fn port(&self) -> Port;
}

/// 注册表句柄
///
/// 由 [`SchedulerHandle::enroll`] 返回，用于之后的注销。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotorHandle {
    index: u32,
    generation: u32,
}

impl MotorHandle {
    /// 槽位索引
    pub fn index(&self) -> u32 {
        self.index
    }

    /// 槽位代数
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot {
    generation: u32,
    motor: Option<Weak<dyn ScheduledMotor>>,
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// 存活句柄，按注册顺序
    order: Vec<MotorHandle>,
}

impl Registry {
    fn find(&self, motor: &Arc<dyn ScheduledMotor>) -> Option<MotorHandle> {
        let target = Arc::as_ptr(motor);
        self.order.iter().copied().find(|handle| {
            self.slots[handle.index as usize]
                .motor
                .as_ref()
                .is_some_and(|weak| std::ptr::addr_eq(weak.as_ptr(), target))
        })
    }

    fn insert(&mut self, motor: &Arc<dyn ScheduledMotor>) -> MotorHandle {
        if let Some(handle) = self.find(motor) {
            return handle;
        }

        let weak = Arc::downgrade(motor);
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.motor = Some(weak);
                MotorHandle {
                    index,
                    generation: slot.generation,
                }
            },
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    motor: Some(weak),
                });
                MotorHandle {
                    index,
                    generation: 0,
                }
            },
        };
        self.order.push(handle);
        handle
    }

    fn remove(&mut self, handle: MotorHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.motor.is_none() {
            return false;
        }
        slot.motor = None;
        self.free.push(handle.index);
        self.order.retain(|h| *h != handle);
        true
    }

    fn contains(&self, handle: MotorHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.motor.is_some())
    }
}

struct SchedulerShared {
    registry: Mutex<Registry>,
    config: SchedulerConfig,
    metrics: SchedulerMetrics,
    is_running: AtomicBool,
}

impl SchedulerShared {
    fn tick(&self) {
        let mut registry = self.registry.lock();
        let mut dead = Vec::new();
        // 本周期升级出的强引用在释放锁之后才析构，析构函数可以安全地调用 remove()
        let mut alive = Vec::with_capacity(registry.order.len());

        for handle in registry.order.iter().copied() {
            let motor = registry.slots[handle.index as usize]
                .motor
                .as_ref()
                .and_then(Weak::upgrade);

            let Some(motor) = motor else {
                // 电机被释放但没有注销（例如所有者 panic），稍后清理
                dead.push(handle);
                continue;
            };

            match motor.update() {
                Ok(()) => {
                    self.metrics.motor_updates_total.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    self.metrics.update_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("Motor update failed on {}: {}", motor.port(), e);
                },
            }
            alive.push(motor);
        }

        for handle in dead {
            debug!("Pruning dangling motor slot {:?}", handle);
            registry.remove(handle);
        }
        drop(registry);
        drop(alive);

        self.metrics.ticks_total.fetch_add(1, Ordering::Relaxed);
    }
}

/// 调度器共享句柄
///
/// 轻量、可克隆，由每个电机持有，用于构造时注册、析构时注销。
/// 持有句柄不会阻止 [`BackgroundScheduler`] 停止其后台线程。
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<SchedulerShared>,
}

impl SchedulerHandle {
    /// 注册电机
    ///
    /// 幂等：同一电机重复注册返回原有句柄，不会在一个周期内被更新两次。
    pub fn enroll(&self, motor: &Arc<dyn ScheduledMotor>) -> MotorHandle {
        let handle = self.shared.registry.lock().insert(motor);
        debug!("Enrolled motor on {} as {:?}", motor.port(), handle);
        handle
    }

    /// 注销电机
    ///
    /// 返回时保证不会再对该电机调用 `update()`。句柄已过期时返回 false。
    pub fn remove(&self, handle: MotorHandle) -> bool {
        let removed = self.shared.registry.lock().remove(handle);
        if removed {
            debug!("Removed motor {:?}", handle);
        }
        removed
    }

    /// 句柄是否仍然有效
    pub fn contains(&self, handle: MotorHandle) -> bool {
        self.shared.registry.lock().contains(handle)
    }

    /// 已注册电机数量
    pub fn len(&self) -> usize {
        self.shared.registry.lock().order.len()
    }

    /// 是否没有任何已注册电机
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 调度周期
    pub fn tick_period(&self) -> Duration {
        self.shared.config.tick_period()
    }

    /// 调度器配置
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// 调度指标
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.shared.metrics
    }

    /// 立即执行一个周期
    ///
    /// 主要用于手动模式（[`BackgroundScheduler::manual`]）和测试。
    /// 与后台线程同时调用是安全的，但会让电机在一个周期内被更新多次。
    pub fn tick(&self) {
        self.shared.tick();
    }
}

/// 后台调度器
///
/// 显式创建、显式传递：程序启动时创建一次，把 [`SchedulerHandle`] 交给每个电机。
/// Drop 时停止并 join 后台线程。
///
/// # 示例
///
/// ```rust
/// use strafe_driver::{BackgroundScheduler, SchedulerConfig};
///
/// let scheduler = BackgroundScheduler::start(SchedulerConfig::default()).unwrap();
/// let handle = scheduler.handle();
/// assert!(handle.is_empty());
/// ```
pub struct BackgroundScheduler {
    shared: Arc<SchedulerShared>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundScheduler {
    /// 创建调度器并启动后台线程
    ///
    /// # 错误
    ///
    /// - `DriverError::InvalidConfig`: 配置校验失败
    /// - `DriverError::SchedulerThread`: 线程创建失败
    pub fn start(config: SchedulerConfig) -> Result<Self, DriverError> {
        let mut scheduler = Self::manual(config)?;
        scheduler.shared.is_running.store(true, Ordering::Release);

        let shared = scheduler.shared.clone();
        let worker = std::thread::Builder::new()
            .name("strafe-scheduler".to_string())
            .spawn(move || tick_loop(shared))
            .map_err(|e| {
                scheduler.shared.is_running.store(false, Ordering::Release);
                DriverError::SchedulerThread(e.to_string())
            })?;

        scheduler.worker = Some(worker);
        Ok(scheduler)
    }

    /// 创建不带后台线程的调度器
    ///
    /// 由调用方通过 [`tick`](Self::tick) 驱动周期，适用于确定性测试或嵌入其他循环。
    pub fn manual(config: SchedulerConfig) -> Result<Self, DriverError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(SchedulerShared {
                registry: Mutex::new(Registry::default()),
                config,
                metrics: SchedulerMetrics::new(),
                is_running: AtomicBool::new(false),
            }),
            worker: None,
        })
    }

    /// 获取共享句柄
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: self.shared.clone(),
        }
    }

    /// 后台线程是否在运行
    pub fn is_running(&self) -> bool {
        self.shared.is_running.load(Ordering::Acquire)
    }

    /// 立即执行一个周期
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// 停止后台线程并等待其退出
    ///
    /// 已注册的电机保持注册状态，但不再被更新。重复调用是安全的。
    pub fn stop(&mut self) {
        self.shared.is_running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Scheduler thread panicked");
            } else {
                info!("Scheduler thread stopped");
            }
        }
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick_loop(shared: Arc<SchedulerShared>) {
    let period = shared.config.tick_period();
    info!("Scheduler thread started (period: {:?})", period);

    let mut deadline = Instant::now() + period;
    while shared.is_running.load(Ordering::Acquire) {
        shared.tick();

        let now = Instant::now();
        if now < deadline {
            // spin_sleep 提供亚毫秒级精度，周期抖动直接影响 PID 的 I/D 项
            spin_sleep::sleep(deadline - now);
            deadline += period;
        } else {
            shared.metrics.tick_overruns.fetch_add(1, Ordering::Relaxed);
            warn!("Scheduler tick overran by {:?}", now - deadline);
            deadline = now + period;
        }
    }
}
