//! NMT（Network Management）

use std::fmt;

use crate::BusError;

/// NMT 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NmtState {
    Initialising,
    PreOperational,
    Operational,
    Stopped,
}

impl fmt::Display for NmtState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialising => "INITIALISING",
            Self::PreOperational => "PRE-OPERATIONAL",
            Self::Operational => "OPERATIONAL",
            Self::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// NMT 状态切换
pub trait NmtControl: Send + Sync {
    /// 请求节点进入指定 NMT 状态
    fn set_state(&self, state: NmtState) -> Result<(), BusError>;

    /// 最近一次已知的 NMT 状态
    fn state(&self) -> NmtState;
}
