//! 状态字（0x6041）解码
//!
//! 每个 `DeviceState` 对应一组 (mask, value)：`raw & mask == value` 即匹配。
//! 匹配按 [`STATUSWORD_STATE_TABLE`] 的固定顺序进行，第一个命中的状态胜出。

use bilge::prelude::*;

use crate::homing::HomingStatus;
use crate::state::DeviceState;

// ============================================================================
// 掩码匹配表
// ============================================================================

/// 状态字掩码条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask {
    pub state: DeviceState,
    pub mask: u16,
    pub value: u16,
}

impl StateMask {
    const fn new(state: DeviceState, mask: u16, value: u16) -> Self {
        Self { state, mask, value }
    }

    /// 该条目是否匹配给定状态字
    #[inline]
    pub fn matches(&self, raw: u16) -> bool {
        raw & self.mask == self.value
    }
}

/// 状态字 → 设备状态 匹配表（顺序即优先级）
pub const STATUSWORD_STATE_TABLE: [StateMask; 8] = [
    StateMask::new(DeviceState::NotReadyToSwitchOn, 0x4F, 0x00),
    StateMask::new(DeviceState::SwitchOnDisabled, 0x4F, 0x40),
    StateMask::new(DeviceState::ReadyToSwitchOn, 0x6F, 0x21),
    StateMask::new(DeviceState::SwitchedOn, 0x6F, 0x23),
    StateMask::new(DeviceState::OperationEnabled, 0x6F, 0x27),
    StateMask::new(DeviceState::Fault, 0x4F, 0x08),
    StateMask::new(DeviceState::FaultReactionActive, 0x4F, 0x0F),
    StateMask::new(DeviceState::QuickStopActive, 0x6F, 0x07),
];

/// 解码状态字
///
/// 返回表中第一个匹配的状态；不符合任何条目（非标准设备）时返回 `None`，
/// 由调用方决定回退策略（状态监视器保留上一个状态）。
#[inline]
pub fn decode(raw: u16) -> Option<DeviceState> {
    STATUSWORD_STATE_TABLE
        .iter()
        .find(|entry| entry.matches(raw))
        .map(|entry| entry.state)
}

/// 状态字 → 用于写入测试/仿真的典型值
///
/// 返回该状态在匹配表中的 `value`，即能解码为该状态的最小状态字。
/// `Start` 没有对应的状态字。
pub fn canonical_statusword(state: DeviceState) -> Option<u16> {
    STATUSWORD_STATE_TABLE
        .iter()
        .find(|entry| entry.state == state)
        .map(|entry| entry.value)
}

// ============================================================================
// 状态字
// ============================================================================

/// 状态字（一次观测，不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// 原始值
    pub fn raw(self) -> u16 {
        self.0
    }

    /// 解码出的设备状态
    pub fn state(self) -> Option<DeviceState> {
        decode(self.0)
    }

    /// 位域视图
    pub fn bits(self) -> StatusWordBits {
        StatusWordBits::from(u16::new(self.0))
    }

    /// 回零状态（仅在回零模式下有意义）
    pub fn homing_status(self) -> Option<HomingStatus> {
        HomingStatus::decode(self.0)
    }
}

impl From<u16> for StatusWord {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

// ============================================================================
// 位域结构定义（使用 bilge）
// ============================================================================

/// 状态字位域
///
/// CiA 402 定义（LSB first）：
/// - Bit 0: Ready to switch on
/// - Bit 1: Switched on
/// - Bit 2: Operation enabled
/// - Bit 3: Fault
/// - Bit 4: Voltage enabled
/// - Bit 5: Quick stop（低有效：0 表示快速停止中）
/// - Bit 6: Switch on disabled
/// - Bit 7: Warning
/// - Bit 8: 厂商自定义
/// - Bit 9: Remote
/// - Bit 10: Target reached
/// - Bit 11: Internal limit active
/// - Bit 12-13: 运行模式相关位
/// - Bit 14-15: 厂商自定义
#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusWordBits {
    pub ready_to_switch_on: bool,    // Bit 0
    pub switched_on: bool,           // Bit 1
    pub operation_enabled: bool,     // Bit 2
    pub fault: bool,                 // Bit 3
    pub voltage_enabled: bool,       // Bit 4
    pub quick_stop: bool,            // Bit 5
    pub switch_on_disabled: bool,    // Bit 6
    pub warning: bool,               // Bit 7
    pub manufacturer_bit8: bool,     // Bit 8
    pub remote: bool,                // Bit 9
    pub target_reached: bool,        // Bit 10
    pub internal_limit_active: bool, // Bit 11
    pub op_mode_specific: u2,        // Bit 12-13
    pub manufacturer_high: u2,       // Bit 14-15
}
