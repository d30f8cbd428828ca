//! 驱动层模块
//!
//! 本模块提供 DS402 节点的底层驱动功能，包括：
//! - 状态字监视（原子状态 + ArcSwap 快照，回调线程单写）
//! - 控制字传输绑定（PDO 优先，SDO 回退）
//! - PDO 发现与 NMT 切换
//!
//! 大多数用户应该使用 `ds402-client` 提供的 `Node402` 高层接口。

mod error;
pub mod setup;
pub mod state;
pub mod transport;

pub use error::DriverError;
pub use setup::{ControlwordTransport, SetupReport, discover};
pub use state::{AtomicDeviceState, StatusMonitor, StatusSnapshot};
pub use transport::{CommandDispatcher, TransportBinding};
