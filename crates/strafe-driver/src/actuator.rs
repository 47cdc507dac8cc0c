//! 执行器抽象
//!
//! 定义电机/编码器对的最小接口。真实硬件绑定（端口配置、固件调用）由外部实现，
//! 测试与仿真使用 [`crate::mock`] 中的实现（需要 `mock` feature）。

use crate::error::DriverError;
use crate::port::Port;

/// 刹车模式
///
/// 决定电机输出为 0 时的行为。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BrakeMode {
    /// 自由滑行（默认）
    #[default]
    Coast,
    /// 短接刹车
    Brake,
    /// 主动保持当前位置
    Hold,
}

/// 执行器 Trait
///
/// 一个端口上的电机及其集成编码器。
///
/// # 实现要求
///
/// - **非阻塞**: `move_speed()` 与 `position()` 在调度线程中调用，
///   慢调用会推迟同一周期内所有其他电机的更新
/// - `set_reversed(true)` 同时翻转输出方向与编码器读数方向
pub trait Actuator: Send {
    /// 以有符号速度驱动电机（通常位于 `[-127, 127]`）
    fn move_speed(&mut self, speed: f64) -> Result<(), DriverError>;

    /// 编码器当前读数（ticks）
    fn position(&self) -> f64;

    /// 设置刹车模式
    fn set_brake_mode(&mut self, mode: BrakeMode);

    /// 设置是否反转
    fn set_reversed(&mut self, reversed: bool);

    /// 绑定的端口
    fn port(&self) -> Port;
}

/// 执行器提供者
///
/// 根据端口号打开执行器。由硬件层或 mock 总线实现，
/// 底盘等组合对象通过它在构造/重建时获得电机。
pub trait ActuatorProvider {
    /// 打开指定端口上的执行器
    fn open(&mut self, port: Port) -> Result<Box<dyn Actuator>, DriverError>;
}

impl<F> ActuatorProvider for F
where
    F: FnMut(Port) -> Result<Box<dyn Actuator>, DriverError>,
{
    fn open(&mut self, port: Port) -> Result<Box<dyn Actuator>, DriverError> {
        self(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    struct NullActuator {
        port: Port,
        speed: f64,
        reversed: bool,
        brake: BrakeMode,
    }

    impl Actuator for NullActuator {
        fn move_speed(&mut self, speed: f64) -> Result<(), DriverError> {
            self.speed = speed;
            Ok(())
        }

        fn position(&self) -> f64 {
            0.0
        }

        fn set_brake_mode(&mut self, mode: BrakeMode) {
            self.brake = mode;
        }

        fn set_reversed(&mut self, reversed: bool) {
            self.reversed = reversed;
        }

        fn port(&self) -> Port {
            self.port
        }
    }

    #[test]
    fn test_brake_mode_default() {
        assert_eq!(BrakeMode::default(), BrakeMode::Coast);
    }

    #[test]
    fn test_closure_provider() {
        let mut provider = |port: Port| -> Result<Box<dyn Actuator>, DriverError> {
            Ok(Box::new(NullActuator {
                port,
                speed: 0.0,
                reversed: false,
                brake: BrakeMode::Coast,
            }))
        };

        let port = Port::new(4).unwrap();
        let mut actuator = provider.open(port).unwrap();
        assert_eq!(actuator.port(), port);
        actuator.set_brake_mode(BrakeMode::Hold);
        actuator.set_reversed(true);
        actuator.move_speed(42.0).unwrap();
        assert_eq!(actuator.position(), 0.0);
    }
}
