//! 运行模式（位标志编码）
//!
//! 编码对应 "Supported drive modes" 对象的位定义，运行模式切换时整值写入。

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum OperationMode {
    #[default]
    NoMode = 0x0000_0000,
    ProfiledPosition = 0x0000_0001,
    Velocity = 0x0000_0002,
    ProfiledVelocity = 0x0000_0004,
    ProfiledTorque = 0x0000_0008,
    Homing = 0x0000_0020,
    InterpolatedPosition = 0x0000_0040,
    /// 周期同步位置（CSP）
    CyclicSynchronousPosition = 0x0000_0080,
    /// 周期同步速度（CSV）
    CyclicSynchronousVelocity = 0x0000_0100,
    /// 周期同步力矩（CST）
    CyclicSynchronousTorque = 0x0000_0200,
    OpenLoopScalar = 0x0001_0000,
    OpenLoopVector = 0x0002_0000,
}

impl OperationMode {
    pub const ALL: [OperationMode; 12] = [
        OperationMode::NoMode,
        OperationMode::ProfiledPosition,
        OperationMode::Velocity,
        OperationMode::ProfiledVelocity,
        OperationMode::ProfiledTorque,
        OperationMode::Homing,
        OperationMode::InterpolatedPosition,
        OperationMode::CyclicSynchronousPosition,
        OperationMode::CyclicSynchronousVelocity,
        OperationMode::CyclicSynchronousTorque,
        OperationMode::OpenLoopScalar,
        OperationMode::OpenLoopVector,
    ];

    /// 位标志值
    #[inline]
    pub fn bits(self) -> u32 {
        self.into()
    }

    /// DS402 模式名称
    pub fn name(self) -> &'static str {
        match self {
            Self::NoMode => "NO MODE",
            Self::ProfiledPosition => "PROFILED POSITION",
            Self::Velocity => "VELOCITY",
            Self::ProfiledVelocity => "PROFILED VELOCITY",
            Self::ProfiledTorque => "PROFILED TORQUE",
            Self::Homing => "HOMING",
            Self::InterpolatedPosition => "INTERPOLATED POSITION",
            Self::CyclicSynchronousPosition => "CYCLIC SYNCHRONOUS POSITION",
            Self::CyclicSynchronousVelocity => "CYCLIC SYNCHRONOUS VELOCITY",
            Self::CyclicSynchronousTorque => "CYCLIC SYNCHRONOUS TORQUE",
            Self::OpenLoopScalar => "OPEN LOOP SCALAR",
            Self::OpenLoopVector => "OPEN LOOP VECTOR",
        }
    }
}

impl TryFrom<u32> for OperationMode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.bits() == value)
            .ok_or(ProtocolError::InvalidOperationModeValue { value })
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationMode {
    type Err = ProtocolError;

    /// 不区分大小写，空格与下划线等价
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' { ' ' } else { c.to_ascii_uppercase() })
            .collect();

        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| ProtocolError::UnknownOperationMode(s.to_string()))
    }
}
