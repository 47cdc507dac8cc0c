//! 底盘层错误类型定义

use strafe_driver::DriverError;
use thiserror::Error;

/// 底盘/机构错误类型
#[derive(Error, Debug)]
pub enum ChassisError {
    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 缺少必需的电机（构建前未设置）
    #[error("Missing required motor: {0}")]
    MissingMotor(&'static str),

    /// 配置超出范围
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// 配置文件解析失败
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ChassisError::MissingMotor("claw").to_string(),
            "Missing required motor: claw"
        );

        let err: ChassisError = DriverError::InvalidPort(21).into();
        assert_eq!(
            err.to_string(),
            "Driver error: Invalid port 21: ports must be between 1-20"
        );
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse: Result<toml::Table, _> = toml::from_str("ports = [");
        let err: ChassisError = parse.unwrap_err().into();
        assert!(matches!(err, ChassisError::Config(_)));
    }
}
