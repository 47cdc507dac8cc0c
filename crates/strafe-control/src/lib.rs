//! 控制算法层
//!
//! 本 crate 提供与硬件无关的纯数值控制算法：
//! - **PID 控制器** (`pid`): 固定周期的单环反馈控制，带积分饱和保护与积分归零
//! - **斜率限制** (`slew`): 限制每个周期内输出的最大变化量（方向感知）
//!
//! 所有类型都不持有全局状态，可以在任意线程中独立使用。
//! 后台调度、执行器绑定等功能由 `strafe-driver` 提供。

mod error;
pub mod pid;
pub mod slew;

pub use error::ControlError;
pub use pid::{PidController, PidProfile};
pub use slew::{SlewLimiter, slew_step, step};

/// 执行器可接受的最大输出幅值（对称区间 `[-MOTOR_OUTPUT_LIMIT, MOTOR_OUTPUT_LIMIT]`）
pub const MOTOR_OUTPUT_LIMIT: f64 = 127.0;
