//! PDO（Process Data Object）映射与回调
//!
//! PDO 是广播式的过程数据：接收方向通过回调通知，发送方向先写字段再触发发送。

use std::sync::Arc;

use smallvec::SmallVec;

use crate::BusError;

/// PDO 报文中的一个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdoField {
    pub name: String,
    pub raw: u32,
}

impl PdoField {
    pub fn new(name: impl Into<String>, raw: u32) -> Self {
        Self {
            name: name.into(),
            raw,
        }
    }
}

/// 一次收到的 PDO 报文
///
/// 单个 PDO 最多 8 字节，字段数通常很少，使用 `SmallVec` 避免堆分配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdoMessage {
    /// 映射名称（如 "TxPDO1"）
    pub mapping: String,
    pub fields: SmallVec<[PdoField; 4]>,
}

impl PdoMessage {
    pub fn new(mapping: impl Into<String>) -> Self {
        Self {
            mapping: mapping.into(),
            fields: SmallVec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, raw: u32) -> Self {
        self.fields.push(PdoField::new(name, raw));
        self
    }

    /// 按名称查找字段
    pub fn get(&self, name: &str) -> Option<u32> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.raw)
    }
}

/// PDO 接收回调
///
/// # 性能要求
///
/// - **非阻塞**: 回调在总线接收线程中执行
/// - **禁止 I/O**: 不得在回调中发起 SDO/PDO 传输
pub trait PdoCallback: Send + Sync {
    fn on_message(&self, message: &PdoMessage);
}

/// 单个 PDO 映射
pub trait PdoMap: Send + Sync {
    /// 映射名称
    fn label(&self) -> &str;

    /// 映射是否启用
    fn is_enabled(&self) -> bool;

    /// 是否包含指定名称的字段
    fn contains(&self, field: &str) -> bool;

    /// 注册接收回调
    fn subscribe(&self, callback: Arc<dyn PdoCallback>);

    /// 设置待发送字段的原始值
    fn set_field(&self, field: &str, raw: u32) -> Result<(), BusError>;

    /// 触发发送
    fn transmit(&self) -> Result<(), BusError>;
}

/// PDO 服务（一个节点的全部映射）
pub trait PdoService: Send + Sync {
    /// 从设备读取当前 PDO 配置
    fn read_configuration(&self) -> Result<(), BusError>;

    /// 按顺序返回所有映射（含未启用的）
    fn maps(&self) -> Vec<Arc<dyn PdoMap>>;
}
