//! 底盘与机构配置
//!
//! 配置对象是普通数据：先整体校验，校验通过后才会打开任何电机。
//! 超出范围的端口、无效的增益在这里以 [`ChassisError::Validation`] 报告。

use crate::error::ChassisError;
use crate::kinematics::Wheel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strafe_control::{MOTOR_OUTPUT_LIMIT, PidProfile};
use strafe_driver::{BrakeMode, MotorConfig, Port};

/// 四个轮子的端口号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelPorts {
    pub top_left: u8,
    pub top_right: u8,
    pub bottom_left: u8,
    pub bottom_right: u8,
}

impl WheelPorts {
    /// 按轮序排列
    pub fn as_array(&self) -> [u8; 4] {
        [self.top_left, self.top_right, self.bottom_left, self.bottom_right]
    }
}

/// 每个轮子是否反转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelReversal {
    pub top_left: bool,
    pub top_right: bool,
    pub bottom_left: bool,
    pub bottom_right: bool,
}

impl WheelReversal {
    /// 按轮序排列
    pub fn as_array(&self) -> [bool; 4] {
        [self.top_left, self.top_right, self.bottom_left, self.bottom_right]
    }
}

fn default_settle_margin() -> f64 {
    10.0
}

fn default_stall_timeout_ms() -> u64 {
    2000
}

fn default_max_velocity() -> f64 {
    MOTOR_OUTPUT_LIMIT
}

fn default_ticks_per_degree() -> f64 {
    1.0
}

/// X-drive 底盘配置
///
/// # 示例
///
/// ```rust
/// use strafe_chassis::XChassisConfig;
///
/// let config = XChassisConfig::from_toml_str(r#"
///     settle_margin = 5.0
///     ticks_per_degree = 2.5
///
///     [ports]
///     top_left = 1
///     top_right = 2
///     bottom_left = 3
///     bottom_right = 4
///
///     [reversed]
///     top_right = true
///     bottom_right = true
///
///     [profile]
///     kp = 0.4
///     ki = 0.0
///     kd = 0.1
/// "#).unwrap();
///
/// assert_eq!(config.settle_margin, 5.0);
/// assert!(config.reversed.top_right);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XChassisConfig {
    /// 轮子端口
    pub ports: WheelPorts,
    /// 轮子反转
    #[serde(default)]
    pub reversed: WheelReversal,
    /// 四个轮子共用的 PID 参数
    pub profile: PidProfile,
    /// 到位判定的误差范围（ticks，严格小于）
    #[serde(default = "default_settle_margin")]
    pub settle_margin: f64,
    /// `settle()` 使用的默认超时（毫秒）
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
    /// 轮子最大速度
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,
    /// 底盘旋转一度对应的轮子编码器 ticks
    #[serde(default = "default_ticks_per_degree")]
    pub ticks_per_degree: f64,
    /// 刹车模式
    #[serde(default)]
    pub brake_mode: BrakeMode,
    /// 斜率限制步长（`None` 时使用调度器默认值）
    #[serde(default)]
    pub slew_step: Option<f64>,
}

impl XChassisConfig {
    /// 以默认值创建配置
    pub fn new(ports: WheelPorts, profile: PidProfile) -> Self {
        Self {
            ports,
            reversed: WheelReversal::default(),
            profile,
            settle_margin: default_settle_margin(),
            stall_timeout_ms: default_stall_timeout_ms(),
            max_velocity: default_max_velocity(),
            ticks_per_degree: default_ticks_per_degree(),
            brake_mode: BrakeMode::default(),
            slew_step: None,
        }
    }

    /// 从 TOML 文本解析并校验
    ///
    /// # 错误
    ///
    /// - `ChassisError::Config`: TOML 语法错误或字段缺失
    /// - `ChassisError::Validation`: 字段超出范围
    pub fn from_toml_str(text: &str) -> Result<Self, ChassisError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// `settle()` 的默认超时
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    /// 校验后的端口（按轮序）
    pub fn wheel_ports(&self) -> Result<[Port; 4], ChassisError> {
        let raw = self.ports.as_array();
        let [tl, tr, bl, br] = Wheel::ALL.map(|wheel| checked_port(wheel.name(), raw[wheel.index()]));
        let ports = [tl?, tr?, bl?, br?];

        for (i, port) in ports.iter().enumerate() {
            if ports[i + 1..].contains(port) {
                return Err(ChassisError::Validation(format!(
                    "{port} is assigned to more than one wheel"
                )));
            }
        }
        Ok(ports)
    }

    /// 某个轮子的电机配置
    pub(crate) fn motor_config(&self, wheel: Wheel, port: Port) -> MotorConfig {
        let mut config = MotorConfig::new(port, self.profile)
            .with_max_velocity(self.max_velocity)
            .with_reversed(self.reversed.as_array()[wheel.index()])
            .with_brake_mode(self.brake_mode);
        config.slew_step = self.slew_step;
        config
    }

    /// 整体校验
    pub fn validate(&self) -> Result<(), ChassisError> {
        let ports = self.wheel_ports()?;
        // 增益、速度、步长与单个电机的校验一致
        self.motor_config(Wheel::TopLeft, ports[0])
            .validate()
            .map_err(validation)?;

        if !(self.settle_margin.is_finite() && self.settle_margin > 0.0) {
            return Err(ChassisError::Validation(format!(
                "settle_margin must be finite and positive, got {}",
                self.settle_margin
            )));
        }
        if self.stall_timeout_ms == 0 {
            return Err(ChassisError::Validation(
                "stall_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if !(self.ticks_per_degree.is_finite() && self.ticks_per_degree > 0.0) {
            return Err(ChassisError::Validation(format!(
                "ticks_per_degree must be finite and positive, got {}",
                self.ticks_per_degree
            )));
        }
        Ok(())
    }
}

/// 机械臂电机配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmMotorConfig {
    /// 端口号（1-20）
    pub port: u8,
    /// PID 参数
    pub profile: PidProfile,
    /// 最大速度（缺省为满量程）
    #[serde(default)]
    pub max_velocity: Option<f64>,
}

/// 爪子电机配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClawConfig {
    /// 端口号（1-20）
    pub port: u8,
    /// 是否反转
    #[serde(default)]
    pub reversed: bool,
}

/// 机械臂组件配置
///
/// 两个电机都是必需的；缺少任何一个时构建失败并返回
/// [`ChassisError::MissingMotor`]。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArmConfig {
    pub arm: Option<ArmMotorConfig>,
    pub claw: Option<ClawConfig>,
}

impl ArmConfig {
    /// 设置机械臂电机
    pub fn with_arm(mut self, port: u8, profile: PidProfile) -> Self {
        self.arm = Some(ArmMotorConfig {
            port,
            profile,
            max_velocity: None,
        });
        self
    }

    /// 设置机械臂最大速度
    ///
    /// 必须先调用 [`with_arm`](Self::with_arm)，否则忽略。
    pub fn with_arm_max_velocity(mut self, velocity: f64) -> Self {
        if let Some(arm) = self.arm.as_mut() {
            arm.max_velocity = Some(velocity);
        }
        self
    }

    /// 设置爪子电机
    pub fn with_claw(mut self, port: u8, reversed: bool) -> Self {
        self.claw = Some(ClawConfig { port, reversed });
        self
    }
}

fn validation(e: impl std::fmt::Display) -> ChassisError {
    ChassisError::Validation(e.to_string())
}

/// 端口号校验（供机构配置使用）
pub(crate) fn checked_port(name: &str, number: u8) -> Result<Port, ChassisError> {
    Port::new(number).map_err(|e| ChassisError::Validation(format!("{name}: {e}")))
}
