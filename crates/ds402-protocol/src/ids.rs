//! 对象字典索引常量
//!
//! 仅列出电源状态机与运行模式切换用到的对象。

/// 控制字（Controlword）
pub const OD_CONTROLWORD: u16 = 0x6040;

/// 状态字（Statusword）
pub const OD_STATUSWORD: u16 = 0x6041;

/// 运行模式（Modes of operation）
pub const OD_MODES_OF_OPERATION: u16 = 0x6060;

/// 运行模式显示（Modes of operation display）
pub const OD_MODES_OF_OPERATION_DISPLAY: u16 = 0x6061;

/// 支持的驱动模式（Supported drive modes，位标志）
///
/// [`OperationMode`](crate::mode::OperationMode) 的位标志编码对应此对象，
/// 运行模式切换默认写入这里。
pub const OD_SUPPORTED_DRIVE_MODES: u16 = 0x6502;

/// PDO 映射中状态字字段的名称
pub const FIELD_STATUSWORD: &str = "Statusword";

/// PDO 映射中控制字字段的名称
pub const FIELD_CONTROLWORD: &str = "Controlword";
