//! 驱动层模块
//!
//! 本模块把控制算法绑定到物理执行器，并在后台以固定周期驱动它们：
//! - 执行器抽象（`Actuator`，按端口号绑定电机/编码器）
//! - 后台调度线程（`BackgroundScheduler`，句柄索引的电机注册表）
//! - PID 电机（`ControlledMotor`，构造时注册、析构时注销）
//! - 调度指标（原子计数器）
//!
//! # 线程模型
//!
//! 调度线程独占调用每个电机的 `update()`；应用线程可以同时调用
//! `set()`/`target()`/`at_target()`。两者之间只共享一个由锁保护的指令槽。

pub mod actuator;
pub mod config;
mod error;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod motor;
mod port;
pub mod scheduler;

pub use actuator::{Actuator, ActuatorProvider, BrakeMode};
pub use config::{MotorConfig, SchedulerConfig};
pub use error::DriverError;
pub use metrics::{SchedulerMetrics, SchedulerMetricsSnapshot};
pub use motor::{ControlledMotor, MotorCommand};
pub use port::Port;
pub use scheduler::{BackgroundScheduler, MotorHandle, ScheduledMotor, SchedulerHandle};
