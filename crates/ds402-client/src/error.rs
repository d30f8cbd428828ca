//! 错误类型体系
//!
//! 区分致命错误（本次调用失败）与可恢复错误（在超时窗口内重试）。
//!
//! # 示例
//!
//! ```rust
//! use ds402_client::Ds402Error;
//!
//! fn handle_error(err: Ds402Error) {
//!     if err.is_fatal() {
//!         eprintln!("致命错误: {}", err);
//!     } else if err.is_retryable() {
//!         eprintln!("可重试错误: {}", err);
//!     } else {
//!         eprintln!("错误: {}", err);
//!     }
//! }
//! ```

use ds402_bus::{BusError, SdoAbortCode};
use ds402_driver::DriverError;
use ds402_protocol::{DeviceState, ProtocolError};
use thiserror::Error;

/// DS402 节点错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ds402Error {
    // ==================== Fatal Errors ====================
    /// setup 失败（如没有状态字映射）
    #[error("Setup failed: {0}")]
    Setup(DriverError),

    /// 整体超时：在 overall_timeout 内未到达目标状态
    #[error("Timeout reaching {target} after {timeout_ms}ms (last observed: {observed})")]
    OverallTimeout {
        target: DeviceState,
        observed: DeviceState,
        timeout_ms: u64,
    },

    /// 尚未调用 `setup()`
    #[error("Node {node_id} is not configured, call setup() first")]
    NotConfigured { node_id: u8 },

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    // ==================== Surfaced, not retried ====================
    /// 转换表中不存在该边
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: DeviceState, to: DeviceState },

    /// 设备以中止码拒绝了 SDO 请求
    #[error("Device aborted SDO request: {0}")]
    DeviceAbort(SdoAbortCode),

    /// 其他协议错误（如无法解析的状态名/模式名）
    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    // ==================== Recoverable Errors ====================
    /// 单步超时：状态字未在 step_timeout 内跟随
    #[error("Step {from} -> {to} not observed within {timeout_ms}ms")]
    StepTimeout {
        from: DeviceState,
        to: DeviceState,
        timeout_ms: u64,
    },

    /// 通信失败
    #[error("Communication failure: {0}")]
    Communication(String),
}

impl Ds402Error {
    /// 是否为致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Setup(_) | Self::OverallTimeout { .. } | Self::NotConfigured { .. } | Self::Config(_)
        )
    }

    /// 是否可重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StepTimeout { .. } | Self::Communication(_))
    }

    /// SDO 中止码（仅 `DeviceAbort` 有）
    pub fn abort_code(&self) -> Option<SdoAbortCode> {
        match self {
            Self::DeviceAbort(code) => Some(*code),
            _ => None,
        }
    }

    /// 是否为指定中止码
    pub fn is_abort_code(&self, code: SdoAbortCode) -> bool {
        self.abort_code() == Some(code)
    }
}

impl From<BusError> for Ds402Error {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Aborted(code) => Self::DeviceAbort(code),
            BusError::Communication(msg) => Self::Communication(msg),
            other => Self::Communication(other.to_string()),
        }
    }
}

impl From<ProtocolError> for Ds402Error {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::IllegalTransition { from, to } => Self::IllegalTransition { from, to },
            other => Self::Protocol(other),
        }
    }
}

impl From<DriverError> for Ds402Error {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Bus(e) => e.into(),
            DriverError::Protocol(e) => e.into(),
            setup @ DriverError::NoStatuswordMapping { .. } => Self::Setup(setup),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, Ds402Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let fatal = Ds402Error::OverallTimeout {
            target: DeviceState::OperationEnabled,
            observed: DeviceState::SwitchedOn,
            timeout_ms: 15000,
        };
        assert!(fatal.is_fatal());
        assert!(!fatal.is_retryable());

        let step = Ds402Error::StepTimeout {
            from: DeviceState::SwitchedOn,
            to: DeviceState::OperationEnabled,
            timeout_ms: 1000,
        };
        assert!(!step.is_fatal());
        assert!(step.is_retryable());

        let illegal = Ds402Error::IllegalTransition {
            from: DeviceState::Fault,
            to: DeviceState::SwitchedOn,
        };
        assert!(!illegal.is_fatal());
        assert!(!illegal.is_retryable());
    }

    #[test]
    fn test_bus_error_conversion() {
        let err: Ds402Error = BusError::Aborted(SdoAbortCode::WRITE_READ_ONLY).into();
        assert!(err.is_abort_code(SdoAbortCode::WRITE_READ_ONLY));
        assert!(!err.is_abort_code(SdoAbortCode::GENERAL_ERROR));

        let err: Ds402Error = BusError::communication("no response").into();
        assert_eq!(err, Ds402Error::Communication("no response".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_driver_error_conversion() {
        let err: Ds402Error = DriverError::NoStatuswordMapping { node_id: 2 }.into();
        assert!(matches!(err, Ds402Error::Setup(_)));
        assert!(err.is_fatal());

        let err: Ds402Error = DriverError::Protocol(ProtocolError::IllegalTransition {
            from: DeviceState::SwitchOnDisabled,
            to: DeviceState::SwitchedOn,
        })
        .into();
        assert_eq!(
            format!("{}", err),
            "Illegal transition from SWITCH ON DISABLED to SWITCHED ON"
        );
    }

    #[test]
    fn test_overall_timeout_display() {
        let err = Ds402Error::OverallTimeout {
            target: DeviceState::OperationEnabled,
            observed: DeviceState::ReadyToSwitchOn,
            timeout_ms: 200,
        };
        assert_eq!(
            format!("{}", err),
            "Timeout reaching OPERATION ENABLED after 200ms (last observed: READY TO SWITCH ON)"
        );
    }
}
