//! # DS402 Bus Layer
//!
//! CANopen 协作方抽象层：NMT 状态切换、SDO 读写、PDO 映射与回调。
//!
//! 本层只定义电源状态机所需的窄接口，不实现 CANopen 协议栈本身。
//! 实际总线由上层注入实现了 [`RemoteNode`] 的对象；测试时可启用
//! `mock` feature 使用 [`mock::SimulatedDrive`]。

use thiserror::Error;

pub mod nmt;
pub mod pdo;
pub mod sdo;

#[cfg(feature = "mock")]
pub mod mock;

pub use nmt::{NmtControl, NmtState};
pub use pdo::{PdoCallback, PdoField, PdoMap, PdoMessage, PdoService};
pub use sdo::{SdoAbortCode, SdoAccessor};

/// 总线层统一错误类型
///
/// 通信失败与 SDO 中止必须可区分：前者在超时窗口内可重试，
/// 后者携带设备给出的中止码。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// 通信失败（超时、总线关闭、适配器断开等）
    #[error("Communication failure: {0}")]
    Communication(String),

    /// 设备以中止码拒绝了 SDO 请求
    #[error("SDO aborted: {0}")]
    Aborted(SdoAbortCode),

    /// PDO 映射中不存在该字段
    #[error("PDO mapping {mapping} has no field {field}")]
    UnknownField { mapping: String, field: String },
}

impl BusError {
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication(message.into())
    }

    /// SDO 中止码（仅 `Aborted` 有）
    pub fn abort_code(&self) -> Option<SdoAbortCode> {
        match self {
            Self::Aborted(code) => Some(*code),
            _ => None,
        }
    }

    /// 是否为通信失败
    pub fn is_communication(&self) -> bool {
        matches!(self, Self::Communication(_))
    }
}

/// 远程 CANopen 节点
///
/// 聚合一个节点的 NMT、SDO、PDO 三类服务。实现必须可跨线程共享：
/// PDO 回调在总线线程中触发，而控制流在调用方线程中运行。
pub trait RemoteNode: Send + Sync {
    /// 节点 ID（1..=127）
    fn node_id(&self) -> u8;

    fn nmt(&self) -> &dyn NmtControl;

    fn sdo(&self) -> &dyn SdoAccessor;

    fn pdo(&self) -> &dyn PdoService;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_code_accessor() {
        let err = BusError::Aborted(SdoAbortCode::WRITE_READ_ONLY);
        assert_eq!(err.abort_code(), Some(SdoAbortCode(0x0601_0002)));
        assert!(!err.is_communication());

        let err = BusError::communication("bus off");
        assert_eq!(err.abort_code(), None);
        assert!(err.is_communication());
    }

    #[test]
    fn test_error_display() {
        let err = BusError::Aborted(SdoAbortCode::OBJECT_DOES_NOT_EXIST);
        assert_eq!(
            format!("{}", err),
            "SDO aborted: 0x06020000 (Object does not exist in the object dictionary)"
        );
        let err = BusError::UnknownField {
            mapping: "RxPDO1".to_string(),
            field: "Controlword".to_string(),
        };
        assert_eq!(format!("{}", err), "PDO mapping RxPDO1 has no field Controlword");
    }
}
