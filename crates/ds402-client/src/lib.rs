//! 客户端接口模块
//!
//! 本模块提供 DS402 节点的高层接口，包括：
//! - setup：PDO 发现、状态回调注册、控制字传输绑定
//! - 状态请求（两级超时，逐级使能）
//! - 故障复位
//! - 运行模式切换
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。如果需要直接访问状态监视器或传输绑定，
//! 可以使用 `ds402-driver`。

pub mod config;
mod error;
mod node;

pub use config::{ModeSwitchConfig, NodeConfig, StateMachineConfig};
pub use error::{Ds402Error, Result};
pub use node::Node402;
