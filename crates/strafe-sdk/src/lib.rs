//! Strafe SDK - 竞赛机器人电机控制核心
//!
//! 在后台以固定周期运行一组独立整定的 PID 电机，并把它们组合成协调运动
//! （可全向移动的 X-drive 底盘，带停转检测）。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **控制层** (`control`): PID 控制器与斜率限制，纯计算、无 I/O
//! - **驱动层** (`driver`): 执行器抽象、后台调度线程、PID 电机
//! - **底盘层** (`chassis`): X-drive 运动学、到位/停转检测、机械臂组件
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use strafe_sdk::prelude::*;
//!
//! strafe_sdk::init_logger();
//!
//! let scheduler = BackgroundScheduler::start(SchedulerConfig::default())?;
//! let config = XChassisConfig::from_toml_str(&std::fs::read_to_string("chassis.toml")?)?;
//! let chassis = XChassis::new(&scheduler.handle(), config, &mut hardware)?;
//!
//! chassis.forward(1000.0);
//! match chassis.settle() {
//!     StallOutcome::Settled => {},
//!     StallOutcome::Stalled => chassis.backward(200.0),
//!     StallOutcome::Abandoned => {},
//! }
//! ```

pub mod prelude;

pub use strafe_chassis as chassis;
pub use strafe_control as control;
pub use strafe_driver as driver;

// 常用类型
pub use strafe_chassis::{
    ArmAssembly, ArmConfig, ChassisError, ChassisState, DriveModel, StallOutcome, XChassis,
    XChassisConfig,
};
pub use strafe_control::{ControlError, PidController, PidProfile, SlewLimiter};
pub use strafe_driver::{
    Actuator, ActuatorProvider, BackgroundScheduler, BrakeMode, ControlledMotor, DriverError,
    MotorConfig, Port, SchedulerConfig, SchedulerHandle,
};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

/// 日志初始化错误
pub type LoggerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 初始化日志
///
/// 使用 `RUST_LOG` 过滤（未设置时为 `info`），同时把 `log` crate 的记录转发到 `tracing`。
/// 重复调用是安全的：已经初始化时什么都不做。
pub fn init_logger() {
    if let Err(e) = try_init_logger() {
        tracing::debug!("Logger already initialized: {}", e);
    }
}

/// 初始化日志，已初始化时返回错误
pub fn try_init_logger() -> Result<(), LoggerError> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    log::debug!("log records are forwarded to tracing");
    Ok(())
}
