//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use strafe_sdk::prelude::*;
//! ```

// 控制层
pub use strafe_control::{PidController, PidProfile, SlewLimiter};

// 驱动层
pub use strafe_driver::{
    Actuator, ActuatorProvider, BackgroundScheduler, BrakeMode, ControlledMotor, MotorCommand,
    MotorConfig, Port, SchedulerConfig, SchedulerHandle,
};

// 底盘层（DriveModel 需要在作用域内才能调用 forward/turn 等方法）
pub use strafe_chassis::{
    ArmAssembly, ArmConfig, ChassisState, DriveModel, StallOutcome, WheelPorts, XChassis,
    XChassisConfig,
};

// 错误类型
pub use strafe_chassis::ChassisError;
pub use strafe_control::ControlError;
pub use strafe_driver::DriverError;
