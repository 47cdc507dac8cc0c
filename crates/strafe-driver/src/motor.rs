//! PID 控制电机
//!
//! [`ControlledMotor`] 把一个 [`PidController`] 绑定到一个执行器上：
//! 构造时向调度器注册，析构时注销。应用线程只写指令槽，
//! 控制器累积项只由调度线程在 `update()` 中修改。

use crate::actuator::{Actuator, ActuatorProvider, BrakeMode};
use crate::config::{MotorConfig, validate_max_velocity};
use crate::error::DriverError;
use crate::port::Port;
use crate::scheduler::{MotorHandle, ScheduledMotor, SchedulerHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use strafe_control::{ControlError, MOTOR_OUTPUT_LIMIT, PidController, PidProfile, SlewLimiter};
use tracing::{debug, trace};

/// 电机指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    /// 闭环位置目标（ticks），输出由 PID 计算
    Position(f64),
    /// 开环速度，直接下发（只限制在执行器范围 ±127 内，不受 PID 输出区间影响）
    Velocity(f64),
}

struct LoopState {
    pid: PidController,
    slew: Option<SlewLimiter>,
    /// 上一周期是否处于位置模式
    position_mode: bool,
}

/// 调度线程与应用线程共享的电机内核
///
/// 锁顺序：`actuator` → `loop_state`。`command` 只被短暂持有，不与其他锁嵌套。
struct MotorCore {
    port: Port,
    command: Mutex<Option<MotorCommand>>,
    loop_state: Mutex<LoopState>,
    actuator: Mutex<Box<dyn Actuator>>,
}

impl ScheduledMotor for MotorCore {
    fn update(&self) -> Result<(), DriverError> {
        let command = *self.command.lock();
        let mut actuator = self.actuator.lock();
        let position = actuator.position();

        let output = {
            let mut state = self.loop_state.lock();
            let raw = match command {
                // 从未设置目标：失效安全，输出 0
                None => 0.0,
                Some(MotorCommand::Position(target)) => {
                    if !state.position_mode {
                        state.pid.reset();
                    }
                    state.pid.set_target(target);
                    state.pid.update(position)?
                },
                Some(MotorCommand::Velocity(velocity)) => {
                    velocity.clamp(-MOTOR_OUTPUT_LIMIT, MOTOR_OUTPUT_LIMIT)
                },
            };
            state.position_mode = matches!(command, Some(MotorCommand::Position(_)));

            match (&mut state.slew, command) {
                (Some(slew), Some(_)) => slew.next(raw),
                (Some(slew), None) => {
                    slew.reset_to(0.0);
                    0.0
                },
                (None, _) => raw,
            }
        };

        trace!("{}: position={:.2} output={:.2}", self.port, position, output);
        actuator.move_speed(output)
    }

    fn port(&self) -> Port {
        self.port
    }
}

/// PID 控制电机
///
/// # 示例
///
/// ```rust,ignore
/// use strafe_control::PidProfile;
/// use strafe_driver::mock::MockBus;
/// use strafe_driver::{BackgroundScheduler, ControlledMotor, MotorConfig, Port, SchedulerConfig};
///
/// let scheduler = BackgroundScheduler::manual(SchedulerConfig::default()).unwrap();
/// let mut bus = MockBus::new(0.1);
/// let config = MotorConfig::new(Port::new(1).unwrap(), PidProfile::new(0.5, 0.0, 0.0));
/// let motor = ControlledMotor::open(&scheduler.handle(), config, &mut bus).unwrap();
///
/// motor.set(100.0);
/// for _ in 0..200 {
///     scheduler.tick();
/// }
/// assert!(motor.at_target(5.0));
/// ```
pub struct ControlledMotor {
    core: Arc<MotorCore>,
    scheduler: SchedulerHandle,
    handle: MotorHandle,
}

impl ControlledMotor {
    /// 创建电机并注册到调度器
    ///
    /// PID 输出区间为 `[-max_velocity, max_velocity]`。斜率限制步长优先使用
    /// `config.slew_step`，否则使用调度器的默认值。
    ///
    /// # 错误
    ///
    /// - `DriverError::Control` / `DriverError::InvalidConfig`: 配置校验失败
    /// - `DriverError::InvalidConfig`: 执行器端口与配置不一致
    pub fn new(
        scheduler: &SchedulerHandle,
        config: MotorConfig,
        mut actuator: Box<dyn Actuator>,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        if actuator.port() != config.port {
            return Err(DriverError::InvalidConfig(format!(
                "actuator bound to {} but config expects {}",
                actuator.port(),
                config.port
            )));
        }

        actuator.set_reversed(config.reversed);
        actuator.set_brake_mode(config.brake_mode);

        let pid = PidController::new(-config.max_velocity, config.max_velocity, config.profile)?;
        let slew = config
            .slew_step
            .or(scheduler.config().default_slew_step)
            .map(SlewLimiter::new);

        let core = Arc::new(MotorCore {
            port: config.port,
            command: Mutex::new(None),
            loop_state: Mutex::new(LoopState {
                pid,
                slew,
                position_mode: false,
            }),
            actuator: Mutex::new(actuator),
        });

        let scheduled: Arc<dyn ScheduledMotor> = core.clone();
        let handle = scheduler.enroll(&scheduled);

        Ok(Self {
            core,
            scheduler: scheduler.clone(),
            handle,
        })
    }

    /// 通过执行器提供者打开端口并创建电机
    pub fn open(
        scheduler: &SchedulerHandle,
        config: MotorConfig,
        provider: &mut dyn ActuatorProvider,
    ) -> Result<Self, DriverError> {
        let actuator = provider.open(config.port)?;
        Self::new(scheduler, config, actuator)
    }

    /// 设置位置目标
    ///
    /// 只记录目标，不直接驱动执行器；最迟在下一个周期生效。
    pub fn set(&self, target: f64) {
        *self.core.command.lock() = Some(MotorCommand::Position(target));
    }

    /// 切换到开环速度模式
    pub fn set_velocity(&self, velocity: f64) {
        *self.core.command.lock() = Some(MotorCommand::Velocity(velocity));
    }

    /// 当前指令（未设置时为 `None`）
    pub fn command(&self) -> Option<MotorCommand> {
        *self.core.command.lock()
    }

    /// 当前位置目标
    ///
    /// # 错误
    ///
    /// 从未设置位置目标（或处于速度模式）时返回
    /// `DriverError::Control(ControlError::TargetNotSet)`。
    pub fn target(&self) -> Result<f64, DriverError> {
        match self.command() {
            Some(MotorCommand::Position(target)) => Ok(target),
            _ => Err(ControlError::TargetNotSet.into()),
        }
    }

    /// 当前位置是否在目标的 `margin` 范围内（严格小于）
    ///
    /// 没有位置目标时返回 false。
    pub fn at_target(&self, margin: f64) -> bool {
        let Ok(target) = self.target() else {
            return false;
        };
        (self.position() - target).abs() < margin
    }

    /// 编码器当前读数
    pub fn position(&self) -> f64 {
        self.core.actuator.lock().position()
    }

    /// 把输出区间收窄为 `[-velocity, velocity]`
    pub fn set_maximum_velocity(&self, velocity: f64) -> Result<(), DriverError> {
        validate_max_velocity(velocity)?;
        self.core.loop_state.lock().pid.set_range(-velocity, velocity)?;
        debug!("{}: max velocity set to {}", self.core.port, velocity);
        Ok(())
    }

    /// 当前输出区间
    pub fn range(&self) -> (f64, f64) {
        self.core.loop_state.lock().pid.range()
    }

    /// 替换 PID 参数（下一个周期生效）
    pub fn set_profile(&self, profile: PidProfile) -> Result<(), DriverError> {
        self.core.loop_state.lock().pid.set_profile(profile)?;
        Ok(())
    }

    /// 当前 PID 参数
    pub fn profile(&self) -> PidProfile {
        self.core.loop_state.lock().pid.profile()
    }

    /// 设置刹车模式
    pub fn set_brake_mode(&self, mode: BrakeMode) {
        self.core.actuator.lock().set_brake_mode(mode);
    }

    /// 端口
    pub fn port(&self) -> Port {
        self.core.port
    }

    /// 调度器注册句柄
    pub fn handle(&self) -> MotorHandle {
        self.handle
    }
}

impl Drop for ControlledMotor {
    fn drop(&mut self) {
        // remove() 会等待正在进行的周期结束
        self.scheduler.remove(self.handle);
        debug!("{}: unregistered from scheduler", self.core.port);
    }
}

impl std::fmt::Debug for ControlledMotor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlledMotor")
            .field("port", &self.core.port)
            .field("handle", &self.handle)
            .field("command", &self.command())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::mock::MockBus;
    use crate::scheduler::BackgroundScheduler;

    fn port(n: u8) -> Port {
        Port::new(n).unwrap()
    }

    fn setup(config: SchedulerConfig) -> (BackgroundScheduler, MockBus) {
        (BackgroundScheduler::manual(config).unwrap(), MockBus::new(0.1))
    }

    fn p_motor(scheduler: &BackgroundScheduler, bus: &mut MockBus, n: u8) -> ControlledMotor {
        let config = MotorConfig::new(port(n), PidProfile::new(0.5, 0.0, 0.0));
        ControlledMotor::open(&scheduler.handle(), config, bus).unwrap()
    }

    #[test]
    fn test_unset_target_commands_zero() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);

        scheduler.tick();
        assert_eq!(bus.move_calls(port(1)), 1);
        assert_eq!(bus.last_speed(port(1)), 0.0);
        assert!(matches!(
            motor.target(),
            Err(DriverError::Control(ControlError::TargetNotSet))
        ));
        assert!(!motor.at_target(1000.0));
    }

    #[test]
    fn test_set_does_not_move_until_tick() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);

        motor.set(100.0);
        assert_eq!(bus.move_calls(port(1)), 0);
        assert_eq!(motor.target().unwrap(), 100.0);

        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 50.0);
    }

    #[test]
    fn test_converges_to_target() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);

        motor.set(-250.0);
        for _ in 0..500 {
            scheduler.tick();
        }
        assert!(motor.at_target(1.0), "position = {}", motor.position());
    }

    #[test]
    fn test_at_target_is_strict() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);

        motor.set(10.0);
        bus.set_position(port(1), 15.0);
        assert!(!motor.at_target(5.0));
        assert!(motor.at_target(5.01));
        drop(scheduler);
    }

    #[test]
    fn test_maximum_velocity_clamps_output() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);

        motor.set_maximum_velocity(30.0).unwrap();
        assert_eq!(motor.range(), (-30.0, 30.0));
        motor.set(1000.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 30.0);

        assert!(motor.set_maximum_velocity(0.0).is_err());
        assert!(motor.set_maximum_velocity(200.0).is_err());
        assert_eq!(motor.range(), (-30.0, 30.0));
    }

    #[test]
    fn test_velocity_mode_passes_through() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);

        motor.set_velocity(-60.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), -60.0);

        motor.set_velocity(500.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 127.0);

        // 速度模式不受 PID 输出区间限制
        motor.set_maximum_velocity(20.0).unwrap();
        motor.set_velocity(90.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 90.0);

        assert!(motor.target().is_err());
        assert!(!motor.at_target(1e9));
    }

    #[test]
    fn test_slew_limits_acceleration() {
        let config = SchedulerConfig {
            tick_period_ms: 10,
            default_slew_step: Some(10.0),
        };
        let (scheduler, mut bus) = setup(config);
        let motor = p_motor(&scheduler, &mut bus, 1);

        motor.set_velocity(100.0);
        let mut outputs = Vec::new();
        for _ in 0..3 {
            scheduler.tick();
            outputs.push(bus.last_speed(port(1)));
        }
        assert_eq!(outputs, vec![10.0, 20.0, 30.0]);

        // 同向减速立即生效
        motor.set_velocity(5.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 5.0);
    }

    #[test]
    fn test_motor_config_slew_overrides_default() {
        let config = SchedulerConfig {
            tick_period_ms: 10,
            default_slew_step: Some(10.0),
        };
        let (scheduler, mut bus) = setup(config);
        let motor_config =
            MotorConfig::new(port(2), PidProfile::new(1.0, 0.0, 0.0)).with_slew_step(40.0);
        let motor = ControlledMotor::open(&scheduler.handle(), motor_config, &mut bus).unwrap();

        motor.set_velocity(100.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(2)), 40.0);
    }

    #[test]
    fn test_config_applied_to_actuator() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let config = MotorConfig::new(port(4), PidProfile::new(1.0, 0.0, 0.0))
            .with_reversed(true)
            .with_brake_mode(BrakeMode::Hold);
        let motor = ControlledMotor::open(&scheduler.handle(), config, &mut bus).unwrap();

        let state = bus.snapshot(port(4));
        assert!(state.reversed);
        assert_eq!(state.brake_mode, BrakeMode::Hold);

        motor.set_brake_mode(BrakeMode::Brake);
        assert_eq!(bus.snapshot(port(4)).brake_mode, BrakeMode::Brake);
    }

    #[test]
    fn test_port_mismatch_rejected() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let actuator = bus.open(port(1)).unwrap();
        let config = MotorConfig::new(port(2), PidProfile::default());
        assert!(matches!(
            ControlledMotor::new(&scheduler.handle(), config, actuator),
            Err(DriverError::InvalidConfig(_))
        ));
        assert!(scheduler.handle().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let motor = p_motor(&scheduler, &mut bus, 1);
        let handle = motor.handle();
        assert!(scheduler.handle().contains(handle));

        drop(motor);
        assert!(!scheduler.handle().contains(handle));
        scheduler.tick();
        assert_eq!(bus.move_calls(port(1)), 0);
    }

    #[test]
    fn test_actuator_error_does_not_stop_scheduler() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let _failing = p_motor(&scheduler, &mut bus, 1);
        let healthy = p_motor(&scheduler, &mut bus, 2);
        bus.set_failing(port(1), true);

        healthy.set(10.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(2)), 5.0);
        assert_eq!(scheduler.handle().metrics().snapshot().update_errors, 1);
    }

    #[test]
    fn test_switching_back_to_position_resets_integral() {
        let (scheduler, mut bus) = setup(SchedulerConfig::default());
        let config = MotorConfig::new(port(1), PidProfile::new(0.0, 1.0, 0.0));
        let motor = ControlledMotor::open(&scheduler.handle(), config, &mut bus).unwrap();
        bus.jam(port(1));

        motor.set(10.0);
        scheduler.tick();
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 20.0);

        motor.set_velocity(0.0);
        scheduler.tick();
        motor.set(10.0);
        scheduler.tick();
        assert_eq!(bus.last_speed(port(1)), 10.0);
    }
}
