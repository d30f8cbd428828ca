//! # DS402 Protocol
//!
//! CiA 402（DS402）驱动器电源状态机的协议定义（无总线依赖）
//!
//! ## 模块
//!
//! - `ids`: 对象字典索引常量
//! - `state`: 设备状态枚举（`DeviceState`）
//! - `statusword`: 状态字解码（掩码匹配表 + 位域视图）
//! - `controlword`: 控制字编码与状态转换表
//! - `planner`: 通往 OPERATION ENABLED 的逐级路径规划
//! - `mode`: 运行模式（位标志）
//! - `homing`: 回零相关的控制字位与状态字掩码
//!
//! ## 数据流
//!
//! ```text
//! 状态字 (0x6041) ──decode──▶ DeviceState ──planner/lookup──▶ ControlCode ──▶ 控制字 (0x6040)
//! ```

pub mod controlword;
pub mod homing;
pub mod ids;
pub mod mode;
pub mod planner;
pub mod state;
pub mod statusword;

// 重新导出常用类型
pub use controlword::*;
pub use homing::*;
pub use ids::*;
pub use mode::*;
pub use planner::*;
pub use state::*;
pub use statusword::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 状态转换表中不存在该边
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: DeviceState, to: DeviceState },

    #[error("Unknown device state name: {0}")]
    UnknownStateName(String),

    #[error("Unknown operation mode: {0}")]
    UnknownOperationMode(String),

    #[error("Invalid operation mode value: 0x{value:X}")]
    InvalidOperationModeValue { value: u32 },
}
