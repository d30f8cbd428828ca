//! 使能路径规划
//!
//! 从任意状态出发，每次给出通往 OPERATION ENABLED 的下一个中间状态。
//! 规则按固定顺序匹配，第一条命中即返回。

use crate::state::DeviceState;

/// 通往 OPERATION ENABLED 的下一个中间状态
///
/// | 当前状态 | 下一状态 |
/// |---------|---------|
/// | START | NOT READY TO SWITCH ON |
/// | FAULT, NOT READY TO SWITCH ON | SWITCH ON DISABLED |
/// | SWITCH ON DISABLED | READY TO SWITCH ON |
/// | READY TO SWITCH ON | SWITCHED ON |
/// | SWITCHED ON, QUICK STOP ACTIVE, OPERATION ENABLED | OPERATION ENABLED |
/// | FAULT REACTION ACTIVE | FAULT |
///
/// 每一步 (current, next) 要么是合法转换边，要么 current 已是 OPERATION ENABLED。
pub fn next_toward_enable(current: DeviceState) -> DeviceState {
    use DeviceState::*;

    match current {
        Start => NotReadyToSwitchOn,
        Fault | NotReadyToSwitchOn => SwitchOnDisabled,
        SwitchOnDisabled => ReadyToSwitchOn,
        ReadyToSwitchOn => SwitchedOn,
        SwitchedOn | QuickStopActive | OperationEnabled => OperationEnabled,
        FaultReactionActive => Fault,
    }
}

/// 从 `from` 到 OPERATION ENABLED 的完整路径（不含起点）
///
/// 仅用于诊断与日志；实际执行时每一步都以观测到的状态字为准。
pub fn enable_path(from: DeviceState) -> Vec<DeviceState> {
    let mut path = Vec::new();
    let mut current = from;
    while current != DeviceState::OperationEnabled {
        current = next_toward_enable(current);
        path.push(current);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlword::is_legal;
    use DeviceState::*;
    use proptest::prelude::*;

    #[test]
    fn test_next_toward_enable_table() {
        assert_eq!(next_toward_enable(Start), NotReadyToSwitchOn);
        assert_eq!(next_toward_enable(NotReadyToSwitchOn), SwitchOnDisabled);
        assert_eq!(next_toward_enable(Fault), SwitchOnDisabled);
        assert_eq!(next_toward_enable(SwitchOnDisabled), ReadyToSwitchOn);
        assert_eq!(next_toward_enable(ReadyToSwitchOn), SwitchedOn);
        assert_eq!(next_toward_enable(SwitchedOn), OperationEnabled);
        assert_eq!(next_toward_enable(QuickStopActive), OperationEnabled);
        assert_eq!(next_toward_enable(OperationEnabled), OperationEnabled);
        assert_eq!(next_toward_enable(FaultReactionActive), Fault);
    }

    #[test]
    fn test_enable_path_from_not_ready() {
        assert_eq!(
            enable_path(NotReadyToSwitchOn),
            vec![SwitchOnDisabled, ReadyToSwitchOn, SwitchedOn, OperationEnabled]
        );
        assert!(enable_path(OperationEnabled).is_empty());
    }

    #[test]
    fn test_enable_path_from_fault_reaction() {
        assert_eq!(
            enable_path(FaultReactionActive),
            vec![
                Fault,
                SwitchOnDisabled,
                ReadyToSwitchOn,
                SwitchedOn,
                OperationEnabled
            ]
        );
    }

    fn any_state() -> impl Strategy<Value = DeviceState> {
        (0u8..=8).prop_map(|v| DeviceState::from_u8(v).unwrap())
    }

    proptest! {
        /// 每一步都是合法边，且最多 6 步到达 OPERATION ENABLED
        #[test]
        fn prop_planner_steps_are_legal_and_terminate(start in any_state()) {
            let mut current = start;
            let mut steps = 0;
            while current != OperationEnabled {
                let next = next_toward_enable(current);
                prop_assert!(is_legal(current, next), "{} -> {}", current, next);
                current = next;
                steps += 1;
                prop_assert!(steps <= 6);
            }
        }
    }
}
