//! 状态监视
//!
//! 状态字回调是"当前状态"与"最近原始状态字"的唯一写入者；
//! 控制流线程只读。热路径全部使用原子量，完整快照通过 ArcSwap 发布。

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use ds402_bus::{PdoCallback, PdoMessage};
use ds402_protocol::{DeviceState, FIELD_STATUSWORD, StatusWord};
use tracing::trace;

// ============================================================================
// 原子设备状态
// ============================================================================

/// 设备状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicDeviceState {
    inner: AtomicU8,
}

impl AtomicDeviceState {
    pub fn new(state: DeviceState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 读取当前状态
    ///
    /// 内部只会写入有效值；万一读到无效值按 NOT READY TO SWITCH ON 处理。
    pub fn get(&self, ordering: Ordering) -> DeviceState {
        DeviceState::from_u8(self.inner.load(ordering)).unwrap_or(DeviceState::NotReadyToSwitchOn)
    }

    pub fn set(&self, state: DeviceState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }

    /// 写入新状态并返回旧状态
    pub fn swap(&self, state: DeviceState, ordering: Ordering) -> DeviceState {
        DeviceState::from_u8(self.inner.swap(state.as_u8(), ordering))
            .unwrap_or(DeviceState::NotReadyToSwitchOn)
    }
}

impl Default for AtomicDeviceState {
    fn default() -> Self {
        Self::new(DeviceState::NotReadyToSwitchOn)
    }
}

// ============================================================================
// 状态快照
// ============================================================================

/// 一次状态字观测的完整快照
#[derive(Debug, Clone, Copy)]
pub struct StatusSnapshot {
    pub statusword: StatusWord,
    /// 解码结果；`None` 表示该状态字不匹配任何状态（状态保持不变）
    pub decoded: Option<DeviceState>,
    pub received_at: Instant,
    /// 第几次更新（从 1 开始）
    pub sequence: u64,
}

// ============================================================================
// 状态监视器
// ============================================================================

/// 无状态字时的哨兵值（状态字只有 16 位）
const NO_STATUSWORD: u32 = u32::MAX;

/// 状态监视器
///
/// 作为 [`PdoCallback`] 注册到携带状态字的 PDO 映射上。回调中只做解码与原子写入，
/// 不发起任何总线传输。
#[derive(Debug)]
pub struct StatusMonitor {
    state: AtomicDeviceState,
    raw: AtomicU32,
    updates: AtomicU64,
    snapshot: ArcSwapOption<StatusSnapshot>,
}

impl StatusMonitor {
    /// 新建监视器，初始状态为 NOT READY TO SWITCH ON
    pub fn new() -> Self {
        Self {
            state: AtomicDeviceState::default(),
            raw: AtomicU32::new(NO_STATUSWORD),
            updates: AtomicU64::new(0),
            snapshot: ArcSwapOption::empty(),
        }
    }

    /// 当前设备状态（最近一次可解码状态字的结果）
    #[inline]
    pub fn state(&self) -> DeviceState {
        self.state.get(Ordering::Acquire)
    }

    /// 最近一次收到的原始状态字；尚未收到时返回 `None`
    pub fn last_statusword(&self) -> Option<StatusWord> {
        match self.raw.load(Ordering::Acquire) {
            NO_STATUSWORD => None,
            raw => Some(StatusWord(raw as u16)),
        }
    }

    /// 累计收到的状态字数量
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.snapshot.load_full()
    }

    /// 处理一个状态字（唯一写入路径）
    pub fn ingest(&self, raw: u16) {
        let statusword = StatusWord(raw);
        let decoded = statusword.state();

        self.raw.store(raw as u32, Ordering::Release);
        if let Some(state) = decoded {
            let previous = self.state.swap(state, Ordering::AcqRel);
            if previous != state {
                trace!("statusword 0x{:04X}: {} -> {}", raw, previous, state);
            }
        } else {
            trace!("statusword 0x{:04X} matches no state, keeping {}", raw, self.state());
        }
        let sequence = self.updates.fetch_add(1, Ordering::AcqRel) + 1;

        self.snapshot.store(Some(Arc::new(StatusSnapshot {
            statusword,
            decoded,
            received_at: Instant::now(),
            sequence,
        })));
    }
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdoCallback for StatusMonitor {
    fn on_message(&self, message: &PdoMessage) {
        if let Some(raw) = message.get(FIELD_STATUSWORD) {
            self.ingest(raw as u16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let monitor = StatusMonitor::new();
        assert_eq!(monitor.state(), DeviceState::NotReadyToSwitchOn);
        assert_eq!(monitor.last_statusword(), None);
        assert_eq!(monitor.update_count(), 0);
        assert!(monitor.snapshot().is_none());
    }

    #[test]
    fn test_ingest_updates_state_and_raw() {
        let monitor = StatusMonitor::new();
        monitor.ingest(0x0237);
        assert_eq!(monitor.state(), DeviceState::SwitchedOn);
        assert_eq!(monitor.last_statusword(), Some(StatusWord(0x0237)));

        let snapshot = monitor.snapshot().unwrap();
        assert_eq!(snapshot.decoded, Some(DeviceState::SwitchedOn));
        assert_eq!(snapshot.sequence, 1);
    }

    #[test]
    fn test_unmatched_statusword_keeps_previous_state() {
        let monitor = StatusMonitor::new();
        monitor.ingest(0x0021);
        assert_eq!(monitor.state(), DeviceState::ReadyToSwitchOn);

        monitor.ingest(0x0001);
        assert_eq!(monitor.state(), DeviceState::ReadyToSwitchOn);
        // 原始值仍然记录
        assert_eq!(monitor.last_statusword(), Some(StatusWord(0x0001)));
        assert_eq!(monitor.snapshot().unwrap().decoded, None);
        assert_eq!(monitor.update_count(), 2);
    }

    #[test]
    fn test_pdo_callback_reads_statusword_field() {
        let monitor = StatusMonitor::new();
        let message = PdoMessage::new("TxPDO1")
            .with_field("Velocity actual value", 12)
            .with_field(FIELD_STATUSWORD, 0x0627);
        monitor.on_message(&message);
        assert_eq!(monitor.state(), DeviceState::OperationEnabled);

        // 不含状态字的报文被忽略
        monitor.on_message(&PdoMessage::new("TxPDO2").with_field("Position", 1));
        assert_eq!(monitor.update_count(), 1);
    }

    #[test]
    fn test_atomic_device_state_swap() {
        let cell = AtomicDeviceState::new(DeviceState::Fault);
        let old = cell.swap(DeviceState::SwitchOnDisabled, Ordering::Relaxed);
        assert_eq!(old, DeviceState::Fault);
        assert_eq!(cell.get(Ordering::Relaxed), DeviceState::SwitchOnDisabled);
    }

    #[test]
    fn test_concurrent_reader_sees_valid_states() {
        let monitor = Arc::new(StatusMonitor::new());
        let writer = {
            let monitor = monitor.clone();
            std::thread::spawn(move || {
                for i in 0..1000u16 {
                    monitor.ingest(if i % 2 == 0 { 0x0023 } else { 0x0027 });
                }
            })
        };
        for _ in 0..1000 {
            let state = monitor.state();
            assert!(matches!(
                state,
                DeviceState::NotReadyToSwitchOn
                    | DeviceState::SwitchedOn
                    | DeviceState::OperationEnabled
            ));
        }
        writer.join().unwrap();
        assert_eq!(monitor.update_count(), 1000);
    }
}
