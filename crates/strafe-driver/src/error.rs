//! 驱动层错误类型定义

use strafe_control::ControlError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 控制算法错误（未设置目标、参数无效等）
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    /// 端口号超出范围
    #[error("Invalid port {0}: ports must be between 1-20")]
    InvalidPort(u8),

    /// 执行器错误
    #[error("Actuator error on port {port}: {message}")]
    Actuator {
        /// 出错的端口号
        port: u8,
        /// 错误描述
        message: String,
    },

    /// 配置无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 调度线程错误
    #[error("Scheduler thread error: {0}")]
    SchedulerThread(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use strafe_control::ControlError;

    #[test]
    fn test_driver_error_display() {
        let msg = format!("{}", DriverError::InvalidPort(0));
        assert_eq!(msg, "Invalid port 0: ports must be between 1-20");

        let err = DriverError::Actuator {
            port: 3,
            message: "disconnected".to_string(),
        };
        assert_eq!(format!("{err}"), "Actuator error on port 3: disconnected");

        let msg = format!("{}", DriverError::SchedulerThread("spawn failed".to_string()));
        assert!(msg.contains("Scheduler thread") && msg.contains("spawn failed"));
    }

    #[test]
    fn test_from_control_error() {
        let err: DriverError = ControlError::TargetNotSet.into();
        assert!(matches!(err, DriverError::Control(ControlError::TargetNotSet)));
    }
}
