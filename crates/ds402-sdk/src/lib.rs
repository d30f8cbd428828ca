//! DS402 SDK - CiA 402 驱动器电源状态机
//!
//! 监督并命令 CANopen 驱动器在 DS402 电源状态之间转换：解码异步到达的状态字，
//! 规划并执行多步转换，处理单步与整体超时，通过 PDO 或 SDO 发送控制字。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 状态字解码、转换表、使能路径、运行模式
//! - **总线层** (`bus`): NMT/SDO/PDO 协作方接口（`mock` feature 提供仿真驱动器）
//! - **驱动层** (`driver`): 状态监视、传输绑定、PDO 发现
//! - **客户端层** (`client`): `Node402` 高层接口
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use ds402_sdk::prelude::*;
//!
//! ds402_sdk::init_logger();
//!
//! let node = Node402::new(remote_node);
//! node.setup()?;
//! node.request_state(DeviceState::OperationEnabled)?;
//! node.change_mode(OperationMode::CyclicSynchronousPosition)?;
//! ```

pub mod logging;
pub mod prelude;

/// 协议层
pub mod protocol {
    pub use ds402_protocol::*;
}

/// 总线层
pub mod bus {
    pub use ds402_bus::*;
}

/// 驱动层
pub mod driver {
    pub use ds402_driver::*;
}

/// 客户端层
pub mod client {
    pub use ds402_client::*;
}

// --- 用户以此为界 ---

pub use bus::{BusError, RemoteNode, SdoAbortCode};
pub use client::{Ds402Error, ModeSwitchConfig, Node402, NodeConfig, Result, StateMachineConfig};
pub use driver::{DriverError, SetupReport};
pub use logging::{init_logger, init_logger_with_filter, try_init_logger_with_filter};
pub use protocol::{DeviceState, HomingStatus, OperationMode, ProtocolError, StatusWord};
