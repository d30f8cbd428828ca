//! SDO（Service Data Object）访问
//!
//! 请求/响应式的对象字典读写。

use std::fmt;

use crate::BusError;

/// SDO 访问接口
///
/// 值统一按 u32 传递，实际宽度由对象字典条目决定，由实现负责截断/扩展。
pub trait SdoAccessor: Send + Sync {
    /// 读取 `index:subindex`
    fn upload(&self, index: u16, subindex: u8) -> Result<u32, BusError>;

    /// 写入 `index:subindex`
    fn download(&self, index: u16, subindex: u8, value: u32) -> Result<(), BusError>;
}

/// SDO 中止码（CiA 301）
///
/// 未列出的厂商码原样保留数值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SdoAbortCode(pub u32);

impl SdoAbortCode {
    pub const TOGGLE_BIT_NOT_ALTERNATED: Self = Self(0x0503_0000);
    pub const PROTOCOL_TIMED_OUT: Self = Self(0x0504_0000);
    pub const INVALID_COMMAND_SPECIFIER: Self = Self(0x0504_0001);
    pub const OUT_OF_MEMORY: Self = Self(0x0504_0005);
    pub const UNSUPPORTED_ACCESS: Self = Self(0x0601_0000);
    pub const READ_WRITE_ONLY: Self = Self(0x0601_0001);
    pub const WRITE_READ_ONLY: Self = Self(0x0601_0002);
    pub const OBJECT_DOES_NOT_EXIST: Self = Self(0x0602_0000);
    pub const OBJECT_NOT_MAPPABLE: Self = Self(0x0604_0041);
    pub const PDO_LENGTH_EXCEEDED: Self = Self(0x0604_0042);
    pub const PARAMETER_INCOMPATIBLE: Self = Self(0x0604_0043);
    pub const HARDWARE_ERROR: Self = Self(0x0606_0000);
    pub const LENGTH_MISMATCH: Self = Self(0x0607_0010);
    pub const SUBINDEX_DOES_NOT_EXIST: Self = Self(0x0609_0011);
    pub const VALUE_RANGE_EXCEEDED: Self = Self(0x0609_0030);
    pub const GENERAL_ERROR: Self = Self(0x0800_0000);
    pub const CANNOT_TRANSFER: Self = Self(0x0800_0020);
    pub const CANNOT_TRANSFER_LOCAL_CONTROL: Self = Self(0x0800_0021);
    pub const CANNOT_TRANSFER_DEVICE_STATE: Self = Self(0x0800_0022);

    /// 原始中止码
    pub fn code(self) -> u32 {
        self.0
    }

    /// 标准描述；未知码返回 `None`
    pub fn description(self) -> Option<&'static str> {
        let text = match self {
            Self::TOGGLE_BIT_NOT_ALTERNATED => "Toggle bit not alternated",
            Self::PROTOCOL_TIMED_OUT => "SDO protocol timed out",
            Self::INVALID_COMMAND_SPECIFIER => "Client/server command specifier not valid or unknown",
            Self::OUT_OF_MEMORY => "Out of memory",
            Self::UNSUPPORTED_ACCESS => "Unsupported access to an object",
            Self::READ_WRITE_ONLY => "Attempt to read a write only object",
            Self::WRITE_READ_ONLY => "Attempt to write a read only object",
            Self::OBJECT_DOES_NOT_EXIST => "Object does not exist in the object dictionary",
            Self::OBJECT_NOT_MAPPABLE => "Object cannot be mapped to the PDO",
            Self::PDO_LENGTH_EXCEEDED => "Number and length of objects to be mapped exceeds PDO length",
            Self::PARAMETER_INCOMPATIBLE => "General parameter incompatibility",
            Self::HARDWARE_ERROR => "Access failed due to a hardware error",
            Self::LENGTH_MISMATCH => "Data type does not match, length of service parameter does not match",
            Self::SUBINDEX_DOES_NOT_EXIST => "Sub-index does not exist",
            Self::VALUE_RANGE_EXCEEDED => "Value range of parameter exceeded",
            Self::GENERAL_ERROR => "General error",
            Self::CANNOT_TRANSFER => "Data cannot be transferred or stored to the application",
            Self::CANNOT_TRANSFER_LOCAL_CONTROL => {
                "Data cannot be transferred or stored to the application because of local control"
            },
            Self::CANNOT_TRANSFER_DEVICE_STATE => {
                "Data cannot be transferred or stored to the application because of the present device state"
            },
            _ => return None,
        };
        Some(text)
    }
}

impl From<u32> for SdoAbortCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl fmt::Display for SdoAbortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "0x{:08X} ({})", self.0, text),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
