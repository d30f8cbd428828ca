//! 控制字编码与状态转换表
//!
//! 转换表是数据而非逻辑：每条边 (from, to) 对应一个控制字命令码。
//! 不在表中的 (from, to) 组合即为非法转换。

use std::fmt;

use crate::ProtocolError;
use crate::state::DeviceState;

// ============================================================================
// 控制字命令码
// ============================================================================

/// 控制字命令码（低 8 位）
///
/// 只能由 [`lookup`] 产生，不应在调用方随意构造。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlCode(u8);

impl ControlCode {
    /// Disable voltage（同时用于自动转换）
    pub const DISABLE_VOLTAGE: ControlCode = ControlCode(0x00);
    /// Quick stop
    pub const QUICK_STOP: ControlCode = ControlCode(0x02);
    /// Shutdown
    pub const SHUTDOWN: ControlCode = ControlCode(0x06);
    /// Switch on
    pub const SWITCH_ON: ControlCode = ControlCode(0x07);
    /// Enable operation
    pub const ENABLE_OPERATION: ControlCode = ControlCode(0x0F);
    /// Fault reset（上升沿有效）
    pub const FAULT_RESET: ControlCode = ControlCode(0x80);

    /// 原始值
    pub fn value(self) -> u8 {
        self.0
    }

    /// 写入控制字对象时使用的 16 位值
    pub fn as_controlword(self) -> u16 {
        self.0 as u16
    }

    /// 命令名称
    pub fn name(self) -> &'static str {
        match self.0 {
            0x00 => "DISABLE VOLTAGE",
            0x02 => "QUICK STOP",
            0x06 => "SHUTDOWN",
            0x07 => "SWITCH ON",
            0x0F => "ENABLE OPERATION",
            0x80 => "FAULT RESET",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.0)
    }
}

// ============================================================================
// 状态转换表
// ============================================================================

/// 状态转换表条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DeviceState,
    pub to: DeviceState,
    pub code: ControlCode,
    /// DS402 状态图中的转换编号
    pub number: u8,
}

impl Transition {
    const fn new(from: DeviceState, to: DeviceState, code: ControlCode, number: u8) -> Self {
        Self {
            from,
            to,
            code,
            number,
        }
    }
}

use DeviceState::*;

/// DS402 合法转换边集
pub const TRANSITION_TABLE: [Transition; 18] = [
    // disable voltage
    Transition::new(ReadyToSwitchOn, SwitchOnDisabled, ControlCode::DISABLE_VOLTAGE, 7),
    Transition::new(OperationEnabled, SwitchOnDisabled, ControlCode::DISABLE_VOLTAGE, 9),
    Transition::new(SwitchedOn, SwitchOnDisabled, ControlCode::DISABLE_VOLTAGE, 10),
    Transition::new(QuickStopActive, SwitchOnDisabled, ControlCode::DISABLE_VOLTAGE, 12),
    // automatic
    Transition::new(NotReadyToSwitchOn, SwitchOnDisabled, ControlCode::DISABLE_VOLTAGE, 1),
    Transition::new(Start, NotReadyToSwitchOn, ControlCode::DISABLE_VOLTAGE, 0),
    Transition::new(FaultReactionActive, Fault, ControlCode::DISABLE_VOLTAGE, 14),
    // shutdown
    Transition::new(SwitchOnDisabled, ReadyToSwitchOn, ControlCode::SHUTDOWN, 2),
    Transition::new(SwitchedOn, ReadyToSwitchOn, ControlCode::SHUTDOWN, 6),
    Transition::new(OperationEnabled, ReadyToSwitchOn, ControlCode::SHUTDOWN, 8),
    // switch on
    Transition::new(ReadyToSwitchOn, SwitchedOn, ControlCode::SWITCH_ON, 3),
    Transition::new(OperationEnabled, SwitchedOn, ControlCode::SWITCH_ON, 5),
    // enable operation
    Transition::new(SwitchedOn, OperationEnabled, ControlCode::ENABLE_OPERATION, 4),
    Transition::new(QuickStopActive, OperationEnabled, ControlCode::ENABLE_OPERATION, 16),
    // quick stop
    Transition::new(ReadyToSwitchOn, QuickStopActive, ControlCode::QUICK_STOP, 7),
    Transition::new(SwitchedOn, QuickStopActive, ControlCode::QUICK_STOP, 10),
    Transition::new(OperationEnabled, QuickStopActive, ControlCode::QUICK_STOP, 11),
    // fault reset
    Transition::new(Fault, SwitchOnDisabled, ControlCode::FAULT_RESET, 15),
];

/// 查找驱动 (from, to) 这条边的转换
///
/// # 错误
///
/// - `ProtocolError::IllegalTransition`: 转换表中不存在该边
pub fn find_transition(from: DeviceState, to: DeviceState) -> Result<&'static Transition, ProtocolError> {
    TRANSITION_TABLE
        .iter()
        .find(|t| t.from == from && t.to == to)
        .ok_or(ProtocolError::IllegalTransition { from, to })
}

/// 查找驱动 (from, to) 这条边所需的控制字命令码
///
/// # 错误
///
/// - `ProtocolError::IllegalTransition`: 转换表中不存在该边
#[inline]
pub fn lookup(from: DeviceState, to: DeviceState) -> Result<ControlCode, ProtocolError> {
    find_transition(from, to).map(|t| t.code)
}

/// (from, to) 是否为合法边
pub fn is_legal(from: DeviceState, to: DeviceState) -> bool {
    find_transition(from, to).is_ok()
}
