//! 设备状态定义
//!
//! DS402 电源状态机的八个可观测状态，外加仅作为转换起点使用的 `Start` 伪状态。

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// DS402 设备状态
///
/// 当前状态永远由最近一次收到的状态字推导得出，客户端不能直接设置。
///
/// # 使能主路径
///
/// ```text
/// Start ─0─▶ NotReadyToSwitchOn ─1─▶ SwitchOnDisabled ─2─▶ ReadyToSwitchOn
///       ─3─▶ SwitchedOn ─4─▶ OperationEnabled
///
/// FaultReactionActive ─14─▶ Fault ─15─▶ SwitchOnDisabled
/// ```
///
/// 完整的边集见 [`TRANSITION_TABLE`](crate::controlword::TRANSITION_TABLE)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DeviceState {
    /// 未准备好上电（上电后自检阶段）
    NotReadyToSwitchOn = 0,
    /// 禁止上电
    SwitchOnDisabled = 1,
    /// 准备上电
    ReadyToSwitchOn = 2,
    /// 已上电（功率级已开启，未使能）
    SwitchedOn = 3,
    /// 运行使能
    OperationEnabled = 4,
    /// 故障
    Fault = 5,
    /// 故障响应中
    FaultReactionActive = 6,
    /// 快速停止中
    QuickStopActive = 7,
    /// 伪状态：仅用作上电自动转换（transition 0）的起点，状态字解码永远不会产生它
    Start = 8,
}

impl DeviceState {
    /// 所有可由状态字观测到的状态（不含 `Start`）
    pub const OBSERVABLE: [DeviceState; 8] = [
        DeviceState::NotReadyToSwitchOn,
        DeviceState::SwitchOnDisabled,
        DeviceState::ReadyToSwitchOn,
        DeviceState::SwitchedOn,
        DeviceState::OperationEnabled,
        DeviceState::Fault,
        DeviceState::FaultReactionActive,
        DeviceState::QuickStopActive,
    ];

    /// 从 u8 转换
    ///
    /// 无效值返回 `None`。
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NotReadyToSwitchOn),
            1 => Some(Self::SwitchOnDisabled),
            2 => Some(Self::ReadyToSwitchOn),
            3 => Some(Self::SwitchedOn),
            4 => Some(Self::OperationEnabled),
            5 => Some(Self::Fault),
            6 => Some(Self::FaultReactionActive),
            7 => Some(Self::QuickStopActive),
            8 => Some(Self::Start),
            _ => None,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// DS402 标准名称（如 "SWITCHED ON"）
    pub fn name(self) -> &'static str {
        match self {
            Self::NotReadyToSwitchOn => "NOT READY TO SWITCH ON",
            Self::SwitchOnDisabled => "SWITCH ON DISABLED",
            Self::ReadyToSwitchOn => "READY TO SWITCH ON",
            Self::SwitchedOn => "SWITCHED ON",
            Self::OperationEnabled => "OPERATION ENABLED",
            Self::Fault => "FAULT",
            Self::FaultReactionActive => "FAULT REACTION ACTIVE",
            Self::QuickStopActive => "QUICK STOP ACTIVE",
            Self::Start => "START",
        }
    }

    /// 是否处于故障相关状态
    pub fn is_fault(self) -> bool {
        matches!(self, Self::Fault | Self::FaultReactionActive)
    }

    /// 是否为可观测状态（非 `Start`）
    pub fn is_observable(self) -> bool {
        self != Self::Start
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceState {
    type Err = ProtocolError;

    /// 解析 DS402 状态名
    ///
    /// 不区分大小写，空格与下划线等价。"DISABLE VOLTAGE" 作为
    /// "SWITCH ON DISABLED" 的别名接受（请求目标时的习惯写法）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' { ' ' } else { c.to_ascii_uppercase() })
            .collect();

        if normalized == "DISABLE VOLTAGE" {
            return Ok(Self::SwitchOnDisabled);
        }

        Self::OBSERVABLE
            .iter()
            .copied()
            .chain(std::iter::once(Self::Start))
            .find(|state| state.name() == normalized)
            .ok_or_else(|| ProtocolError::UnknownStateName(s.to_string()))
    }
}
