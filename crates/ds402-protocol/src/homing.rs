//! 回零（Homing）相关定义
//!
//! 仅包含数据：回零模式下控制字的命令位与状态字的状态掩码。
//! 回零流程本身不在本库范围内。

use std::fmt;

/// 回零控制字命令位
pub struct HomingCommand;

impl HomingCommand {
    /// Bit 4: 开始回零
    pub const START: u16 = 0x0010;
    /// Bit 8: 暂停
    pub const HALT: u16 = 0x0100;
}

/// 回零状态字掩码（Bit 10 / Bit 12 / Bit 13）
pub const HOMING_STATUS_MASK: u16 = 0x3400;

/// 回零状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomingStatus {
    /// 进行中
    InProgress,
    /// 被中断或未开始
    Interrupted,
    /// 已完成回零，但目标未到达
    AttainedTargetNotReached,
    /// 成功完成
    Successful,
    /// 出错，速度不为零
    ErrorVelocityNotZero,
    /// 出错，速度为零
    ErrorVelocityZero,
}

impl HomingStatus {
    /// 匹配表（mask 统一为 [`HOMING_STATUS_MASK`]）
    const TABLE: [(HomingStatus, u16); 6] = [
        (HomingStatus::InProgress, 0x0000),
        (HomingStatus::Interrupted, 0x0400),
        (HomingStatus::AttainedTargetNotReached, 0x1000),
        (HomingStatus::Successful, 0x1400),
        (HomingStatus::ErrorVelocityNotZero, 0x2000),
        (HomingStatus::ErrorVelocityZero, 0x2400),
    ];

    /// 从状态字解码回零状态
    ///
    /// Bit 12 与 Bit 13 同时置位的组合未定义，返回 `None`。
    pub fn decode(statusword: u16) -> Option<Self> {
        let masked = statusword & HOMING_STATUS_MASK;
        Self::TABLE
            .iter()
            .find(|(_, value)| *value == masked)
            .map(|(status, _)| *status)
    }

    /// 是否为错误状态
    pub fn is_error(self) -> bool {
        matches!(self, Self::ErrorVelocityNotZero | Self::ErrorVelocityZero)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::InProgress => "IN PROGRESS",
            Self::Interrupted => "INTERRUPTED",
            Self::AttainedTargetNotReached => "ATTAINED TARGET NOT REACHED",
            Self::Successful => "SUCCESSFULLY",
            Self::ErrorVelocityNotZero => "ERROR OCCURRED VELOCITY IS NOT ZERO",
            Self::ErrorVelocityZero => "ERROR OCCURRED VELOCITY IS ZERO",
        }
    }
}

impl fmt::Display for HomingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homing_status_decode() {
        assert_eq!(HomingStatus::decode(0x0237), Some(HomingStatus::InProgress));
        assert_eq!(HomingStatus::decode(0x0637), Some(HomingStatus::Interrupted));
        assert_eq!(
            HomingStatus::decode(0x1237),
            Some(HomingStatus::AttainedTargetNotReached)
        );
        assert_eq!(HomingStatus::decode(0x1637), Some(HomingStatus::Successful));
        assert_eq!(
            HomingStatus::decode(0x2237),
            Some(HomingStatus::ErrorVelocityNotZero)
        );
        assert_eq!(
            HomingStatus::decode(0x2637),
            Some(HomingStatus::ErrorVelocityZero)
        );
    }

    #[test]
    fn test_homing_status_undefined_combination() {
        assert_eq!(HomingStatus::decode(0x3000), None);
        assert_eq!(HomingStatus::decode(0x3400), None);
    }

    #[test]
    fn test_homing_error_classification() {
        assert!(HomingStatus::ErrorVelocityZero.is_error());
        assert!(!HomingStatus::Successful.is_error());
    }

    #[test]
    fn test_homing_command_bits() {
        assert_eq!(HomingCommand::START, 1 << 4);
        assert_eq!(HomingCommand::HALT, 1 << 8);
    }
}
