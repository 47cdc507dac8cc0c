//! 调度与电机配置
//!
//! 两个配置都是普通数据（POD），构造后一次性校验，校验通过才会创建运行时对象。

use crate::actuator::BrakeMode;
use crate::error::DriverError;
use crate::port::Port;
use std::time::Duration;
use strafe_control::{MOTOR_OUTPUT_LIMIT, PidProfile};

/// 调度器配置
///
/// # Example
///
/// ```
/// use strafe_driver::SchedulerConfig;
///
/// // 默认配置（10ms 周期，不做斜率限制）
/// let config = SchedulerConfig::default();
/// assert_eq!(config.tick_period_ms, 10);
///
/// // 自定义配置
/// let config = SchedulerConfig {
///     tick_period_ms: 20,
///     default_slew_step: Some(15.0),
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// 调度周期（毫秒）
    ///
    /// PID 假设恒定周期，修改周期需要重新整定参数。
    pub tick_period_ms: u64,
    /// 默认斜率限制步长
    ///
    /// 未在 [`MotorConfig`] 中单独指定步长的电机使用该值；`None` 表示不限制。
    pub default_slew_step: Option<f64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            default_slew_step: None,
        }
    }
}

impl SchedulerConfig {
    /// 调度周期
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.tick_period_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "tick_period_ms must be greater than 0".to_string(),
            ));
        }
        validate_slew_step(self.default_slew_step)
    }
}

fn validate_slew_step(step: Option<f64>) -> Result<(), DriverError> {
    match step {
        Some(step) if !step.is_finite() || step <= 0.0 => Err(DriverError::InvalidConfig(
            format!("slew step must be finite and positive, got {step}"),
        )),
        _ => Ok(()),
    }
}

/// 单个 PID 电机的配置
///
/// # Example
///
/// ```
/// use strafe_driver::{BrakeMode, MotorConfig, Port};
/// use strafe_control::PidProfile;
///
/// let config = MotorConfig::new(Port::new(3).unwrap(), PidProfile::new(0.6, 0.0, 0.1))
///     .with_max_velocity(100.0)
///     .with_brake_mode(BrakeMode::Hold)
///     .with_reversed(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorConfig {
    /// 端口
    pub port: Port,
    /// PID 参数
    pub profile: PidProfile,
    /// 最大输出速度（PID 输出区间为 `[-max_velocity, max_velocity]`）
    pub max_velocity: f64,
    /// 是否反转
    pub reversed: bool,
    /// 刹车模式
    pub brake_mode: BrakeMode,
    /// 斜率限制步长（覆盖调度器默认值）
    pub slew_step: Option<f64>,
}

impl MotorConfig {
    /// 创建配置（满量程速度、不反转、滑行刹车、无斜率限制）
    pub fn new(port: Port, profile: PidProfile) -> Self {
        Self {
            port,
            profile,
            max_velocity: MOTOR_OUTPUT_LIMIT,
            reversed: false,
            brake_mode: BrakeMode::Coast,
            slew_step: None,
        }
    }

    /// 设置最大输出速度
    pub fn with_max_velocity(mut self, max_velocity: f64) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    /// 设置是否反转
    pub fn with_reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// 设置刹车模式
    pub fn with_brake_mode(mut self, brake_mode: BrakeMode) -> Self {
        self.brake_mode = brake_mode;
        self
    }

    /// 设置斜率限制步长
    pub fn with_slew_step(mut self, step: f64) -> Self {
        self.slew_step = Some(step);
        self
    }

    /// 校验配置
    ///
    /// # 错误
    ///
    /// - `DriverError::Control`: PID 参数无效
    /// - `DriverError::InvalidConfig`: 速度不在 `(0, 127]` 或步长无效
    pub fn validate(&self) -> Result<(), DriverError> {
        self.profile.validate()?;
        validate_max_velocity(self.max_velocity)?;
        validate_slew_step(self.slew_step)
    }
}

pub(crate) fn validate_max_velocity(velocity: f64) -> Result<(), DriverError> {
    if !(velocity > 0.0 && velocity <= MOTOR_OUTPUT_LIMIT) {
        return Err(DriverError::InvalidConfig(format!(
            "max velocity must be within (0, {MOTOR_OUTPUT_LIMIT}], got {velocity}"
        )));
    }
    Ok(())
}
