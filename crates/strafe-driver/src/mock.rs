//! Mock 执行器
//!
//! 无硬件依赖的执行器实现，用于单元测试、集成测试和仿真。
//!
//! 物理模型是一个纯积分器：每次 `move_speed(s)` 让编码器读数增加 `s * gain`。
//! `gain = 0` 模拟堵转（输出无法带来位移）。

use crate::actuator::{Actuator, ActuatorProvider, BrakeMode};
use crate::error::DriverError;
use crate::port::Port;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// 单个模拟电机的内部状态
#[derive(Debug, Clone, PartialEq)]
pub struct MockMotorState {
    /// 未反转方向上的原始编码器读数
    pub raw_position: f64,
    /// 最近一次收到的速度指令
    pub last_speed: f64,
    /// 是否反转
    pub reversed: bool,
    /// 刹车模式
    pub brake_mode: BrakeMode,
    /// `move_speed` 调用次数
    pub move_calls: u64,
    /// 为 true 时 `move_speed` 返回错误
    pub fail_moves: bool,
    /// 每单位速度带来的位移
    pub gain: f64,
}

impl MockMotorState {
    fn new(gain: f64) -> Self {
        Self {
            raw_position: 0.0,
            last_speed: 0.0,
            reversed: false,
            brake_mode: BrakeMode::Coast,
            move_calls: 0,
            fail_moves: false,
            gain,
        }
    }

    fn direction(&self) -> f64 {
        if self.reversed { -1.0 } else { 1.0 }
    }
}

/// Mock 执行器
///
/// 状态通过 `Arc<Mutex<_>>` 共享，测试可以在电机运行时修改/观察它。
pub struct MockActuator {
    port: Port,
    state: Arc<Mutex<MockMotorState>>,
}

impl MockActuator {
    /// 创建独立的 mock 执行器
    pub fn new(port: Port, gain: f64) -> Self {
        Self {
            port,
            state: Arc::new(Mutex::new(MockMotorState::new(gain))),
        }
    }

    /// 共享状态的句柄
    pub fn state(&self) -> Arc<Mutex<MockMotorState>> {
        self.state.clone()
    }
}

impl Actuator for MockActuator {
    fn move_speed(&mut self, speed: f64) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.move_calls += 1;
        if state.fail_moves {
            return Err(DriverError::Actuator {
                port: self.port.number(),
                message: "mock actuator failure".to_string(),
            });
        }
        state.last_speed = speed;
        let delta = state.direction() * speed * state.gain;
        state.raw_position += delta;
        Ok(())
    }

    fn position(&self) -> f64 {
        let state = self.state.lock();
        state.direction() * state.raw_position
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        self.state.lock().brake_mode = mode;
    }

    fn set_reversed(&mut self, reversed: bool) {
        self.state.lock().reversed = reversed;
    }

    fn port(&self) -> Port {
        self.port
    }
}

/// Mock 总线
///
/// 按端口管理模拟电机，实现 [`ActuatorProvider`]。同一端口多次打开得到的
/// 执行器共享同一份状态（与真实硬件一致：端口只是标识）。
///
/// # 示例
///
/// ```rust,ignore
/// use strafe_driver::{ActuatorProvider, Port};
/// use strafe_driver::mock::MockBus;
///
/// let mut bus = MockBus::new(0.1);
/// let port = Port::new(1).unwrap();
/// let mut actuator = bus.open(port).unwrap();
/// actuator.move_speed(100.0).unwrap();
/// assert!((bus.position(port) - 10.0).abs() < 1e-9);
/// ```
#[derive(Clone)]
pub struct MockBus {
    motors: Arc<Mutex<HashMap<Port, Arc<Mutex<MockMotorState>>>>>,
    default_gain: f64,
}

impl MockBus {
    /// 创建总线，新电机使用给定增益
    pub fn new(default_gain: f64) -> Self {
        Self {
            motors: Arc::new(Mutex::new(HashMap::new())),
            default_gain,
        }
    }

    fn state(&self, port: Port) -> Arc<Mutex<MockMotorState>> {
        self.motors
            .lock()
            .entry(port)
            .or_insert_with(|| Arc::new(Mutex::new(MockMotorState::new(self.default_gain))))
            .clone()
    }

    /// 端口状态快照
    pub fn snapshot(&self, port: Port) -> MockMotorState {
        self.state(port).lock().clone()
    }

    /// 执行器视角下的编码器读数（考虑反转）
    pub fn position(&self, port: Port) -> f64 {
        let state = self.state(port);
        let state = state.lock();
        state.direction() * state.raw_position
    }

    /// 设置执行器视角下的编码器读数
    pub fn set_position(&self, port: Port, position: f64) {
        let state = self.state(port);
        let mut state = state.lock();
        state.raw_position = state.direction() * position;
    }

    /// 最近一次速度指令
    pub fn last_speed(&self, port: Port) -> f64 {
        self.state(port).lock().last_speed
    }

    /// `move_speed` 调用次数
    pub fn move_calls(&self, port: Port) -> u64 {
        self.state(port).lock().move_calls
    }

    /// 设置增益
    pub fn set_gain(&self, port: Port, gain: f64) {
        self.state(port).lock().gain = gain;
    }

    /// 堵转：输出不再带来位移
    pub fn jam(&self, port: Port) {
        self.set_gain(port, 0.0);
    }

    /// 让 `move_speed` 开始/停止返回错误
    pub fn set_failing(&self, port: Port, failing: bool) {
        self.state(port).lock().fail_moves = failing;
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl ActuatorProvider for MockBus {
    fn open(&mut self, port: Port) -> Result<Box<dyn Actuator>, DriverError> {
        Ok(Box::new(MockActuator {
            port,
            state: self.state(port),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(n: u8) -> Port {
        Port::new(n).unwrap()
    }

    #[test]
    fn test_integrates_speed() {
        let mut actuator = MockActuator::new(port(1), 0.5);
        actuator.move_speed(10.0).unwrap();
        actuator.move_speed(10.0).unwrap();
        assert_eq!(actuator.position(), 10.0);
        assert_eq!(actuator.state().lock().move_calls, 2);
    }

    #[test]
    fn test_reversed_flips_both_directions() {
        let mut actuator = MockActuator::new(port(1), 1.0);
        actuator.set_reversed(true);
        actuator.move_speed(5.0).unwrap();
        // 反转后：正向指令仍然让读数正向增长
        assert_eq!(actuator.position(), 5.0);
        assert_eq!(actuator.state().lock().raw_position, -5.0);
    }

    #[test]
    fn test_bus_shares_state_per_port() {
        let mut bus = MockBus::new(1.0);
        let mut a = bus.open(port(2)).unwrap();
        let b = bus.open(port(2)).unwrap();

        a.move_speed(3.0).unwrap();
        assert_eq!(b.position(), 3.0);
        assert_eq!(bus.last_speed(port(2)), 3.0);

        bus.set_position(port(2), -7.0);
        assert_eq!(a.position(), -7.0);
    }

    #[test]
    fn test_jam_and_failures() {
        let mut bus = MockBus::new(1.0);
        let mut actuator = bus.open(port(3)).unwrap();

        bus.jam(port(3));
        actuator.move_speed(50.0).unwrap();
        assert_eq!(actuator.position(), 0.0);

        bus.set_failing(port(3), true);
        assert!(matches!(
            actuator.move_speed(1.0),
            Err(DriverError::Actuator { port: 3, .. })
        ));
        assert_eq!(bus.move_calls(port(3)), 2);
    }
}
