//! X-drive 底盘
//!
//! 四个 [`ControlledMotor`] 组合成驾驶（速度）和自动（位置）两类运动原语。
//!
//! # 重建
//!
//! 四个电机与配置作为一个整体放在 [`ArcSwap`] 中，`rebuild()` 是一次原子指针交换：
//! 读者要么看到完整的旧轮组，要么看到完整的新轮组。旧轮组在最后一个读者释放后析构，
//! 析构时从调度器注销。正在等待到位的 `stall_until_settled()` 通过代数计数器
//! 发现重建，并以 [`StallOutcome::Abandoned`] 返回。

use crate::config::XChassisConfig;
use crate::error::ChassisError;
use crate::kinematics::{Wheel, XDriveMix};
use crate::state::{AtomicChassisState, ChassisState, StallOutcome};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use strafe_control::MOTOR_OUTPUT_LIMIT;
use strafe_driver::{ActuatorProvider, ControlledMotor, MotorCommand, SchedulerHandle};
use tracing::{debug, info, warn};

/// 底盘运动能力
///
/// 位置类指令（`forward`/`turn` 等）只下发目标，立即返回；
/// [`stall_until_settled`](Self::stall_until_settled) 是唯一的阻塞操作。
pub trait DriveModel {
    /// 驾驶模式：按速度混合驱动，不进入停转监测
    fn swerve(&self, forward: f64, strafe: f64, turn: f64);

    /// 前进指定 ticks
    fn forward(&self, ticks: f64);

    /// 后退指定 ticks
    fn backward(&self, ticks: f64) {
        self.forward(-ticks);
    }

    /// 原地顺时针旋转，每个轮子移动指定 ticks
    fn turn(&self, ticks: f64);

    /// 原地顺时针旋转指定角度
    fn turn_a(&self, degrees: f64);

    /// 旋转到相对旋转基准的绝对角度
    ///
    /// 与当前累计角度的差值归一化到 `(-180, 180]` 后按最短路径旋转。
    fn turn_absolute(&self, degrees: f64);

    /// 阻塞等待到位或超时
    fn stall_until_settled(&self, timeout: Duration) -> StallOutcome;

    /// 所有轮子是否在误差范围内
    fn is_settled(&self) -> bool;

    /// 立即停止
    fn stop(&self);

    /// 把距离基准重置为当前读数
    fn tare_distance(&self);

    /// 相对距离基准的前进距离（ticks）
    fn get_distance(&self) -> f64;

    /// 相对旋转基准的累计角度（度，顺时针为正）
    ///
    /// 不回绕到 `(-180, 180]`：从 90 度执行 `turn_absolute(-90.0)` 后读数为 270。
    fn get_absolute_rotation(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct Baselines {
    distance: [f64; 4],
    rotation: [f64; 4],
}

struct ChassisParts {
    wheels: [ControlledMotor; 4],
    config: XChassisConfig,
    baselines: Mutex<Baselines>,
}

impl ChassisParts {
    fn build(
        scheduler: &SchedulerHandle,
        config: XChassisConfig,
        provider: &mut dyn ActuatorProvider,
    ) -> Result<Self, ChassisError> {
        config.validate()?;
        let ports = config.wheel_ports()?;

        let mut open = |wheel: Wheel| -> Result<ControlledMotor, ChassisError> {
            let motor_config = config.motor_config(wheel, ports[wheel.index()]);
            Ok(ControlledMotor::open(scheduler, motor_config, &mut *provider)?)
        };
        let wheels = [
            open(Wheel::TopLeft)?,
            open(Wheel::TopRight)?,
            open(Wheel::BottomLeft)?,
            open(Wheel::BottomRight)?,
        ];

        let positions = wheels.each_ref().map(ControlledMotor::position);
        Ok(Self {
            wheels,
            config,
            baselines: Mutex::new(Baselines {
                distance: positions,
                rotation: positions,
            }),
        })
    }

    fn positions(&self) -> [f64; 4] {
        self.wheels.each_ref().map(ControlledMotor::position)
    }
}

/// X-drive 底盘
///
/// 可在多个线程间共享（`&self` 方法）；典型用法是自动程序线程下发指令并等待到位，
/// 同时由另一线程在需要时 `rebuild()`。
///
/// # 示例
///
/// ```rust,ignore
/// use strafe_chassis::{DriveModel, StallOutcome, XChassis, XChassisConfig};
///
/// let chassis = XChassis::new(&scheduler.handle(), config, &mut provider)?;
/// chassis.forward(500.0);
/// if chassis.settle() == StallOutcome::Stalled {
///     // 重新规划
/// }
/// ```
pub struct XChassis {
    scheduler: SchedulerHandle,
    parts: ArcSwap<ChassisParts>,
    generation: AtomicU64,
    state: AtomicChassisState,
}

impl XChassis {
    /// 校验配置、打开四个电机并注册到调度器
    ///
    /// # 错误
    ///
    /// - `ChassisError::Validation`: 配置超出范围
    /// - `ChassisError::Driver`: 打开执行器失败
    pub fn new(
        scheduler: &SchedulerHandle,
        config: XChassisConfig,
        provider: &mut dyn ActuatorProvider,
    ) -> Result<Self, ChassisError> {
        let parts = ChassisParts::build(scheduler, config, provider)?;
        info!("X-drive chassis built on ports {:?}", parts.config.ports.as_array());
        Ok(Self {
            scheduler: scheduler.clone(),
            parts: ArcSwap::from_pointee(parts),
            generation: AtomicU64::new(0),
            state: AtomicChassisState::default(),
        })
    }

    /// 用新配置原子替换四个电机
    ///
    /// 新轮组构建失败时旧轮组保持不变。成功后正在进行的停转监测被作废，
    /// 状态回到 `Idle`，距离与旋转基准重置为新电机的当前读数。
    pub fn rebuild(
        &self,
        config: XChassisConfig,
        provider: &mut dyn ActuatorProvider,
    ) -> Result<(), ChassisError> {
        let parts = ChassisParts::build(&self.scheduler, config, provider)?;
        let ports = parts.config.ports.as_array();

        self.parts.store(Arc::new(parts));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.set(ChassisState::Idle, Ordering::Release);

        info!("X-drive chassis rebuilt on ports {:?} (generation {})", ports, generation);
        Ok(())
    }

    /// 当前配置
    pub fn config(&self) -> XChassisConfig {
        self.parts.load().config.clone()
    }

    /// 当前状态
    pub fn state(&self) -> ChassisState {
        self.state.get(Ordering::Acquire)
    }

    /// 重建次数
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 四个轮子的编码器读数（按轮序）
    pub fn wheel_positions(&self) -> [f64; 4] {
        self.parts.load().positions()
    }

    /// 四个轮子的当前指令（按轮序）
    pub fn wheel_commands(&self) -> [Option<MotorCommand>; 4] {
        self.parts.load().wheels.each_ref().map(ControlledMotor::command)
    }

    /// 与 `swerve` 相同的混合，但钳位到执行器满量程 `[-127, 127]`
    ///
    /// 不受配置的最大速度限制，适合手动驾驶。
    pub fn raw_swerve(&self, forward: f64, strafe: f64, turn: f64) {
        self.drive(XDriveMix::new(forward, strafe, turn), MOTOR_OUTPUT_LIMIT);
    }

    /// 向左平移
    pub fn strafe_left(&self, ticks: f64) {
        self.strafe_right(-ticks);
    }

    /// 向右平移
    pub fn strafe_right(&self, ticks: f64) {
        self.move_relative(XDriveMix::new(0.0, ticks, 0.0));
    }

    /// 使用配置的默认超时等待到位
    pub fn settle(&self) -> StallOutcome {
        let timeout = self.parts.load().config.stall_timeout();
        self.stall_until_settled(timeout)
    }

    fn drive(&self, mix: XDriveMix, limit: f64) {
        let parts = self.parts.load();
        for (wheel, velocity) in parts.wheels.iter().zip(mix.mix(limit)) {
            wheel.set_velocity(velocity);
        }
        self.state.set(ChassisState::Idle, Ordering::Release);
    }

    /// 速度指令归零，位置指令改为当前位置；不修改状态
    fn halt(&self) {
        let parts = self.parts.load();
        for wheel in &parts.wheels {
            match wheel.command() {
                Some(MotorCommand::Velocity(_)) => wheel.set_velocity(0.0),
                Some(MotorCommand::Position(_)) => wheel.set(wheel.position()),
                None => {},
            }
        }
    }

    /// 仅在仍处于 `Moving` 时切换到终态
    ///
    /// 等待期间其他线程下发的指令（`swerve`/`stop`/新的位置指令）优先，返回 false。
    fn finish_moving(&self, next: ChassisState) -> bool {
        let swapped = self.state.compare_exchange(
            ChassisState::Moving,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if !swapped {
            debug!("Chassis left Moving during the wait, keeping {:?}", self.state());
        }
        swapped
    }

    fn move_relative(&self, mix: XDriveMix) {
        let parts = self.parts.load();
        for (wheel, delta) in parts.wheels.iter().zip(mix.wheel_contributions()) {
            wheel.set(wheel.position() + delta);
        }
        self.state.set(ChassisState::Moving, Ordering::Release);
        debug!(
            "Chassis move: forward={:.1} strafe={:.1} turn={:.1}",
            mix.forward, mix.strafe, mix.turn
        );
    }
}

impl DriveModel for XChassis {
    fn swerve(&self, forward: f64, strafe: f64, turn: f64) {
        let limit = self.parts.load().config.max_velocity;
        self.drive(XDriveMix::new(forward, strafe, turn), limit);
    }

    fn forward(&self, ticks: f64) {
        self.move_relative(XDriveMix::new(ticks, 0.0, 0.0));
    }

    fn turn(&self, ticks: f64) {
        self.move_relative(XDriveMix::new(0.0, 0.0, ticks));
    }

    fn turn_a(&self, degrees: f64) {
        let ticks_per_degree = self.parts.load().config.ticks_per_degree;
        self.turn(degrees * ticks_per_degree);
    }

    fn turn_absolute(&self, degrees: f64) {
        let delta = shortest_rotation(degrees - self.get_absolute_rotation());
        self.turn_a(delta);
    }

    fn stall_until_settled(&self, timeout: Duration) -> StallOutcome {
        let generation = self.generation.load(Ordering::Acquire);
        let period = self.scheduler.tick_period();
        // 超时过大无法表示为 Instant 时视为没有截止时间
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if self.generation.load(Ordering::Acquire) != generation {
                debug!("Stall monitoring abandoned by rebuild");
                return StallOutcome::Abandoned;
            }
            if self.is_settled() {
                self.finish_moving(ChassisState::Settled);
                return StallOutcome::Settled;
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    period.min(deadline - now)
                },
                None => period,
            };
            spin_sleep::sleep(pause);
        }

        warn!("Chassis stalled: not settled within {:?}", timeout);
        if self.finish_moving(ChassisState::Stalled) {
            self.halt();
        }
        StallOutcome::Stalled
    }

    fn is_settled(&self) -> bool {
        let parts = self.parts.load();
        let margin = parts.config.settle_margin;
        parts.wheels.iter().all(|wheel| wheel.at_target(margin))
    }

    fn stop(&self) {
        self.halt();
        self.state.set(ChassisState::Idle, Ordering::Release);
    }

    fn tare_distance(&self) {
        let parts = self.parts.load();
        let positions = parts.positions();
        parts.baselines.lock().distance = positions;
    }

    fn get_distance(&self) -> f64 {
        let parts = self.parts.load();
        let baseline = parts.baselines.lock().distance;
        XDriveMix::unmix(deltas(parts.positions(), baseline)).forward
    }

    fn get_absolute_rotation(&self) -> f64 {
        let parts = self.parts.load();
        let baseline = parts.baselines.lock().rotation;
        XDriveMix::unmix(deltas(parts.positions(), baseline)).turn / parts.config.ticks_per_degree
    }
}

fn deltas(positions: [f64; 4], baseline: [f64; 4]) -> [f64; 4] {
    [
        positions[0] - baseline[0],
        positions[1] - baseline[1],
        positions[2] - baseline[2],
        positions[3] - baseline[3],
    ]
}

/// 归一化到 `(-180, 180]`
fn shortest_rotation(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}
