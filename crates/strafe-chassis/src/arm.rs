//! 机械臂组件
//!
//! 一个保持位置的 PID 机械臂电机加一个开环爪子电机。

use crate::config::{ArmConfig, checked_port};
use crate::error::ChassisError;
use parking_lot::Mutex;
use strafe_driver::{
    Actuator, ActuatorProvider, BrakeMode, ControlledMotor, MotorConfig, SchedulerHandle,
};
use tracing::debug;

/// 机械臂组件
pub struct ArmAssembly {
    arm: ControlledMotor,
    claw: Mutex<Box<dyn Actuator>>,
}

impl ArmAssembly {
    /// 根据配置构建
    ///
    /// 机械臂电机使用 `Hold` 刹车模式，在没有输出时保持角度。
    ///
    /// # 错误
    ///
    /// - `ChassisError::MissingMotor`: 未设置机械臂或爪子电机
    /// - `ChassisError::Validation`: 端口超出 1-20 或参数无效
    /// - `ChassisError::Driver`: 打开执行器失败
    pub fn new(
        scheduler: &SchedulerHandle,
        config: &ArmConfig,
        provider: &mut dyn ActuatorProvider,
    ) -> Result<Self, ChassisError> {
        let (Some(arm), Some(claw)) = (config.arm.as_ref(), config.claw.as_ref()) else {
            let missing = if config.arm.is_none() { "arm" } else { "claw" };
            return Err(ChassisError::MissingMotor(missing));
        };

        let arm_port = checked_port("arm", arm.port)?;
        let claw_port = checked_port("claw", claw.port)?;
        if arm_port == claw_port {
            return Err(ChassisError::Validation(format!(
                "arm and claw share {arm_port}"
            )));
        }

        let mut arm_config = MotorConfig::new(arm_port, arm.profile).with_brake_mode(BrakeMode::Hold);
        if let Some(velocity) = arm.max_velocity {
            arm_config = arm_config.with_max_velocity(velocity);
        }
        arm_config
            .validate()
            .map_err(|e| ChassisError::Validation(format!("arm: {e}")))?;

        let mut claw_actuator = provider.open(claw_port)?;
        claw_actuator.set_reversed(claw.reversed);
        let arm = ControlledMotor::open(scheduler, arm_config, provider)?;

        debug!("Arm assembly built: arm on {}, claw on {}", arm_port, claw_port);
        Ok(Self {
            arm,
            claw: Mutex::new(claw_actuator),
        })
    }

    /// 设置机械臂位置目标
    pub fn set_arm(&self, target: f64) {
        self.arm.set(target);
    }

    /// 机械臂当前目标
    pub fn arm_target(&self) -> Result<f64, ChassisError> {
        Ok(self.arm.target()?)
    }

    /// 机械臂是否到位
    pub fn arm_at_target(&self, margin: f64) -> bool {
        self.arm.at_target(margin)
    }

    /// 机械臂编码器读数
    pub fn arm_position(&self) -> f64 {
        self.arm.position()
    }

    /// 限制机械臂速度
    pub fn set_arm_max_velocity(&self, velocity: f64) -> Result<(), ChassisError> {
        Ok(self.arm.set_maximum_velocity(velocity)?)
    }

    /// 以给定速度驱动爪子
    pub fn move_claw(&self, speed: f64) -> Result<(), ChassisError> {
        self.claw.lock().move_speed(speed).map_err(ChassisError::from)
    }

    /// 停止爪子
    pub fn stop_claw(&self) -> Result<(), ChassisError> {
        self.move_claw(0.0)
    }

    /// 机械臂电机
    pub fn arm(&self) -> &ControlledMotor {
        &self.arm
    }
}
