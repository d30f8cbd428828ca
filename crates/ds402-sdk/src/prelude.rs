//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use ds402_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{Ds402Error, Node402, NodeConfig};

// 协议层
pub use crate::protocol::{DeviceState, HomingStatus, OperationMode, StatusWord};

// 总线层（常用 Trait）
pub use crate::bus::{NmtControl, PdoMap, PdoService, RemoteNode, SdoAccessor};

// 错误类型
pub use crate::bus::BusError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
