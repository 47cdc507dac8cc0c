//! 底盘层模块
//!
//! 把多个 PID 电机组合成协调运动：
//! - X-drive 底盘（`XChassis`）：驾驶、前进/旋转/平移、到位与停转检测、运行时重建
//! - 机械臂组件（`ArmAssembly`）
//! - 经过校验的配置对象（可从 TOML 加载）
//!
//! # 使用场景
//!
//! 本层面向自动程序与驾驶控制。如果只需要单个电机的闭环控制，
//! 直接使用 `strafe_driver::ControlledMotor`。

mod arm;
pub mod config;
mod error;
pub mod kinematics;
pub mod state;
mod x_drive;

pub use arm::ArmAssembly;
pub use config::{ArmConfig, ArmMotorConfig, ClawConfig, WheelPorts, WheelReversal, XChassisConfig};
pub use error::ChassisError;
pub use kinematics::{Wheel, XDriveMix};
pub use state::{AtomicChassisState, ChassisState, StallOutcome};
pub use x_drive::{DriveModel, XChassis};
