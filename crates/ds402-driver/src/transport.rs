//! 控制字传输
//!
//! 传输方式在 setup 时确定一次，之后只读：PDO 优先，没有控制字映射时回退到 SDO。

use std::fmt;
use std::sync::Arc;

use ds402_bus::{PdoMap, RemoteNode};
use ds402_protocol::{ControlCode, FIELD_CONTROLWORD, OD_CONTROLWORD};
use tracing::trace;

use crate::DriverError;

/// 控制字传输绑定
#[derive(Clone)]
pub enum TransportBinding {
    /// 写入该映射的 "Controlword" 字段后触发发送
    Pdo(Arc<dyn PdoMap>),
    /// SDO 写 0x6040:00
    Sdo,
}

impl TransportBinding {
    pub fn is_pdo(&self) -> bool {
        matches!(self, Self::Pdo(_))
    }

    /// PDO 映射名称（SDO 时为 `None`）
    pub fn mapping(&self) -> Option<&str> {
        match self {
            Self::Pdo(map) => Some(map.label()),
            Self::Sdo => None,
        }
    }
}

impl fmt::Debug for TransportBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdo(map) => f.debug_tuple("Pdo").field(&map.label()).finish(),
            Self::Sdo => f.write_str("Sdo"),
        }
    }
}

impl fmt::Display for TransportBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdo(map) => write!(f, "PDO {}", map.label()),
            Self::Sdo => f.write_str("SDO"),
        }
    }
}

/// 控制字发送器
pub struct CommandDispatcher {
    node: Arc<dyn RemoteNode>,
    binding: TransportBinding,
}

impl CommandDispatcher {
    pub fn new(node: Arc<dyn RemoteNode>, binding: TransportBinding) -> Self {
        Self { node, binding }
    }

    pub fn binding(&self) -> &TransportBinding {
        &self.binding
    }

    /// 通过绑定的传输方式发送控制字
    ///
    /// # 错误
    ///
    /// - `DriverError::Bus`: 传输失败（通信失败或 SDO 中止）
    pub fn send(&self, code: ControlCode) -> Result<(), DriverError> {
        trace!(
            "node {}: controlword {} via {}",
            self.node.node_id(),
            code,
            self.binding
        );
        match &self.binding {
            TransportBinding::Pdo(map) => {
                map.set_field(FIELD_CONTROLWORD, code.as_controlword() as u32)?;
                map.transmit()?;
            },
            TransportBinding::Sdo => {
                self.node
                    .sdo()
                    .download(OD_CONTROLWORD, 0, code.as_controlword() as u32)?;
            },
        }
        Ok(())
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("node_id", &self.node.node_id())
            .field("binding", &self.binding)
            .finish()
    }
}
