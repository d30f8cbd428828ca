//! 驱动层错误类型定义

use ds402_bus::BusError;
use ds402_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// 总线错误（通信失败或 SDO 中止）
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// 协议错误（如非法转换）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 没有任何已启用的 PDO 映射携带状态字
    #[error("Node {node_id}: no enabled PDO mapping carries the Statusword")]
    NoStatuswordMapping { node_id: u8 },
}
