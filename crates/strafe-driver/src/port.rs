//! 端口号

use crate::error::DriverError;
use std::fmt;

/// 经过校验的智能端口号（1-20）
///
/// 端口只标识硬件位置，不拥有硬件本身。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Port(u8);

impl Port {
    /// 最小端口号
    pub const MIN: u8 = 1;
    /// 最大端口号
    pub const MAX: u8 = 20;

    /// 创建端口号
    ///
    /// # 错误
    ///
    /// 超出 `1..=20` 时返回 `DriverError::InvalidPort`。
    pub fn new(number: u8) -> Result<Self, DriverError> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(DriverError::InvalidPort(number))
        }
    }

    /// 端口号数值
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Port {
    type Error = DriverError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u8 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_range() {
        assert!(Port::new(1).is_ok());
        assert!(Port::new(20).is_ok());
        assert_eq!(Port::new(0), Err(DriverError::InvalidPort(0)));
        assert_eq!(Port::new(21), Err(DriverError::InvalidPort(21)));
    }

    #[test]
    fn test_port_conversions() {
        let port = Port::try_from(7).unwrap();
        assert_eq!(port.number(), 7);
        assert_eq!(u8::from(port), 7);
        assert_eq!(port.to_string(), "port 7");
    }
}
