//! 控制层错误类型定义

use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// 在设置目标值之前调用了需要目标值的操作
    #[error("PID target must be set before it can be read or updated")]
    TargetNotSet,

    /// PID 参数无效（非有限值或负值）
    #[error("Invalid PID profile: {0}")]
    InvalidProfile(String),

    /// 输出区间无效（min > max 或包含 NaN）
    #[error("Invalid output range: [{min}, {max}]")]
    InvalidRange {
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::ControlError;

    #[test]
    fn test_control_error_display() {
        let msg = format!("{}", ControlError::TargetNotSet);
        assert!(msg.contains("target must be set"));

        let msg = format!("{}", ControlError::InvalidProfile("kp is NaN".to_string()));
        assert_eq!(msg, "Invalid PID profile: kp is NaN");

        let msg = format!(
            "{}",
            ControlError::InvalidRange {
                min: 5.0,
                max: -5.0
            }
        );
        assert_eq!(msg, "Invalid output range: [5, -5]");
    }
}
