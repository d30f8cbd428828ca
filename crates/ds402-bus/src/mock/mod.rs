//! 仿真 DS402 驱动器
//!
//! 无硬件依赖的 [`RemoteNode`] 实现，供集成测试与示例使用。
//!
//! # 线程模型
//!
//! - 设备线程：串行处理收到的控制字，按转换表推进状态并广播状态字 PDO
//! - 调用方线程：通过 SDO/PDO 写入控制字，写入只是把命令投递进 channel
//!
//! 状态字回调总是在设备线程中触发，与真实总线的接收线程行为一致。
//!
//! # 故障注入
//!
//! - [`SimulatedDrive::set_frozen`]: 忽略控制字，状态字永不跟随
//! - [`SimulatedDrive::fail_next_controlwords`]: 接下来 N 次控制字发送返回通信错误
//! - [`SimulatedDrive::set_sdo_offline`]: 所有 SDO 请求返回通信错误
//! - [`SimulatedDrive::set_mode_abort`]: 写运行模式对象时以指定中止码拒绝
//! - [`SimulatedDrive::set_mode_readback_follows`]: 运行模式回读是否反映写入值

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use ds402_protocol::{
    DeviceState, FIELD_CONTROLWORD, FIELD_STATUSWORD, OD_CONTROLWORD, OD_STATUSWORD,
    OD_SUPPORTED_DRIVE_MODES, TRANSITION_TABLE, canonical_statusword,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    BusError, NmtControl, NmtState, PdoCallback, PdoMap, PdoMessage, PdoService, RemoteNode,
    SdoAbortCode, SdoAccessor,
};

// ============================================================================
// 观测记录
// ============================================================================

/// 控制字经由的传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Pdo,
    Sdo,
}

/// 设备实际收到的一次控制字写入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlwordWrite {
    pub value: u16,
    pub transport: Transport,
}

/// 设备收到的一次 SDO 写入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdoWrite {
    pub index: u16,
    pub subindex: u8,
    pub value: u32,
}

// ============================================================================
// 构建器
// ============================================================================

/// PDO 映射描述
#[derive(Debug, Clone)]
pub struct PdoMapSpec {
    pub label: String,
    pub enabled: bool,
    pub fields: Vec<String>,
}

impl PdoMapSpec {
    pub fn new(label: impl Into<String>, enabled: bool, fields: &[&str]) -> Self {
        Self {
            label: label.into(),
            enabled,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// [`SimulatedDrive`] 构建器
#[derive(Debug, Clone)]
pub struct SimulatedDriveBuilder {
    node_id: u8,
    maps: Vec<PdoMapSpec>,
    initial_state: DeviceState,
    transition_delay: Duration,
    mode_index: u16,
    status_extra_bits: u16,
}

impl Default for SimulatedDriveBuilder {
    fn default() -> Self {
        Self {
            node_id: 1,
            maps: vec![
                PdoMapSpec::new("TxPDO1", true, &[FIELD_STATUSWORD]),
                PdoMapSpec::new("RxPDO1", true, &[FIELD_CONTROLWORD]),
            ],
            initial_state: DeviceState::NotReadyToSwitchOn,
            transition_delay: Duration::from_millis(2),
            mode_index: OD_SUPPORTED_DRIVE_MODES,
            // voltage enabled + remote：不参与状态解码的位
            status_extra_bits: 0x0210,
        }
    }
}

impl SimulatedDriveBuilder {
    pub fn node_id(mut self, node_id: u8) -> Self {
        self.node_id = node_id;
        self
    }

    /// 替换全部 PDO 映射（按给定顺序）
    pub fn maps(mut self, maps: Vec<PdoMapSpec>) -> Self {
        self.maps = maps;
        self
    }

    pub fn initial_state(mut self, state: DeviceState) -> Self {
        self.initial_state = state;
        self
    }

    /// 收到控制字到状态字更新之间的延迟
    pub fn transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = delay;
        self
    }

    pub fn mode_index(mut self, index: u16) -> Self {
        self.mode_index = index;
        self
    }

    /// 叠加在典型状态字上的额外位
    pub fn status_extra_bits(mut self, bits: u16) -> Self {
        self.status_extra_bits = bits;
        self
    }

    pub fn build(self) -> SimulatedDrive {
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut objects = HashMap::new();
        objects.insert((self.mode_index, 0), 0);

        let core = Arc::new(Core {
            node_id: self.node_id,
            mode_index: self.mode_index,
            status_extra_bits: self.status_extra_bits,
            transition_delay: self.transition_delay,
            inner: Mutex::new(DriveInner {
                device_state: self.initial_state,
                nmt: NmtState::PreOperational,
                configuration_read: false,
                objects,
                controlword_log: Vec::new(),
                sdo_log: Vec::new(),
                nmt_log: Vec::new(),
            }),
            frozen: AtomicBool::new(false),
            failing_controlwords: AtomicU32::new(0),
            sdo_offline: AtomicBool::new(false),
            mode_readback_follows: AtomicBool::new(true),
            mode_abort: Mutex::new(None),
        });

        let maps: Vec<Arc<SimPdoMap>> = self
            .maps
            .into_iter()
            .map(|spec| {
                Arc::new(SimPdoMap {
                    spec,
                    pending: Mutex::new(HashMap::new()),
                    subscribers: Mutex::new(Vec::new()),
                    core: core.clone(),
                    commands: tx.clone(),
                })
            })
            .collect();

        let worker_core = core.clone();
        let worker_maps = maps.clone();
        let worker = thread::Builder::new()
            .name(format!("ds402-sim-{}", self.node_id))
            .spawn(move || device_loop(worker_core, worker_maps, rx))
            .ok();

        SimulatedDrive {
            core,
            maps,
            commands: tx,
            worker,
        }
    }
}

// ============================================================================
// 设备内部状态
// ============================================================================

enum DriveCommand {
    Controlword(u16),
    Publish,
    Shutdown,
}

struct DriveInner {
    device_state: DeviceState,
    nmt: NmtState,
    configuration_read: bool,
    objects: HashMap<(u16, u8), u32>,
    controlword_log: Vec<ControlwordWrite>,
    sdo_log: Vec<SdoWrite>,
    nmt_log: Vec<NmtState>,
}

struct Core {
    node_id: u8,
    mode_index: u16,
    status_extra_bits: u16,
    transition_delay: Duration,
    inner: Mutex<DriveInner>,
    frozen: AtomicBool,
    failing_controlwords: AtomicU32,
    sdo_offline: AtomicBool,
    mode_readback_follows: AtomicBool,
    mode_abort: Mutex<Option<SdoAbortCode>>,
}

impl Core {
    fn statusword_for(&self, state: DeviceState) -> u16 {
        canonical_statusword(state).unwrap_or(0) | self.status_extra_bits
    }

    /// 消耗一次注入的控制字发送失败
    fn take_controlword_failure(&self) -> bool {
        self.failing_controlwords
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    fn record_controlword(&self, value: u16, transport: Transport) {
        self.inner
            .lock()
            .controlword_log
            .push(ControlwordWrite { value, transport });
    }

    /// 按转换表推进状态；返回是否发生了转换
    fn apply_controlword(&self, value: u16) -> bool {
        let mut inner = self.inner.lock();
        let from = inner.device_state;
        let next = TRANSITION_TABLE
            .iter()
            .find(|t| t.from == from && t.code.as_controlword() == value)
            .map(|t| t.to);

        match next {
            Some(to) => {
                debug!(
                    "sim node {}: controlword 0x{:04X}, {} -> {}",
                    self.node_id, value, from, to
                );
                inner.device_state = to;
                true
            },
            None => {
                debug!(
                    "sim node {}: controlword 0x{:04X} ignored in {}",
                    self.node_id, value, from
                );
                false
            },
        }
    }
}

fn device_loop(core: Arc<Core>, maps: Vec<Arc<SimPdoMap>>, commands: Receiver<DriveCommand>) {
    while let Ok(command) = commands.recv() {
        match command {
            DriveCommand::Controlword(value) => {
                if core.frozen.load(Ordering::Acquire) {
                    trace!("sim node {}: frozen, dropping 0x{:04X}", core.node_id, value);
                    continue;
                }
                if !core.transition_delay.is_zero() {
                    thread::sleep(core.transition_delay);
                }
                core.apply_controlword(value);
                publish_status(&core, &maps);
            },
            DriveCommand::Publish => publish_status(&core, &maps),
            DriveCommand::Shutdown => break,
        }
    }
    trace!("sim node {}: device thread exiting", core.node_id);
}

/// 广播状态字（仅在 OPERATIONAL 下发送 PDO）
fn publish_status(core: &Core, maps: &[Arc<SimPdoMap>]) {
    let statusword = {
        let mut inner = core.inner.lock();
        let statusword = core.statusword_for(inner.device_state);
        inner.objects.insert((OD_STATUSWORD, 0), statusword as u32);
        if inner.nmt != NmtState::Operational {
            return;
        }
        statusword
    };

    for map in maps
        .iter()
        .filter(|m| m.spec.enabled && m.contains(FIELD_STATUSWORD))
    {
        let mut message = PdoMessage::new(map.spec.label.clone());
        for field in &map.spec.fields {
            let raw = if field == FIELD_STATUSWORD {
                statusword as u32
            } else {
                0
            };
            message = message.with_field(field.clone(), raw);
        }

        // 回调在锁外执行
        let subscribers = map.subscribers.lock().clone();
        for callback in subscribers {
            callback.on_message(&message);
        }
    }
}

// ============================================================================
// PDO 映射
// ============================================================================

struct SimPdoMap {
    spec: PdoMapSpec,
    pending: Mutex<HashMap<String, u32>>,
    subscribers: Mutex<Vec<Arc<dyn PdoCallback>>>,
    core: Arc<Core>,
    commands: Sender<DriveCommand>,
}

impl PdoMap for SimPdoMap {
    fn label(&self) -> &str {
        &self.spec.label
    }

    fn is_enabled(&self) -> bool {
        self.spec.enabled
    }

    fn contains(&self, field: &str) -> bool {
        self.spec.fields.iter().any(|f| f == field)
    }

    fn subscribe(&self, callback: Arc<dyn PdoCallback>) {
        self.subscribers.lock().push(callback);
    }

    fn set_field(&self, field: &str, raw: u32) -> Result<(), BusError> {
        if !self.contains(field) {
            return Err(BusError::UnknownField {
                mapping: self.spec.label.clone(),
                field: field.to_string(),
            });
        }
        self.pending.lock().insert(field.to_string(), raw);
        Ok(())
    }

    fn transmit(&self) -> Result<(), BusError> {
        if self.core.take_controlword_failure() {
            return Err(BusError::communication(format!(
                "{}: transmit failed (injected)",
                self.spec.label
            )));
        }

        let controlword = self.pending.lock().get(FIELD_CONTROLWORD).copied();
        if let Some(raw) = controlword {
            let value = raw as u16;
            self.core.record_controlword(value, Transport::Pdo);
            self.commands
                .send(DriveCommand::Controlword(value))
                .map_err(|_| BusError::communication("simulated drive stopped"))?;
        }
        Ok(())
    }
}

// ============================================================================
// 仿真驱动器
// ============================================================================

/// 仿真 DS402 驱动器
///
/// 状态转换严格按转换表进行：只有 (当前状态, 控制字) 对应表中一条边时才推进。
pub struct SimulatedDrive {
    core: Arc<Core>,
    maps: Vec<Arc<SimPdoMap>>,
    commands: Sender<DriveCommand>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedDrive {
    pub fn builder() -> SimulatedDriveBuilder {
        SimulatedDriveBuilder::default()
    }

    /// 默认配置：TxPDO1 携带状态字，RxPDO1 携带控制字，初始 NOT READY TO SWITCH ON
    pub fn new() -> Self {
        Self::builder().build()
    }

    // ------------------------------------------------------------------------
    // 观测
    // ------------------------------------------------------------------------

    pub fn device_state(&self) -> DeviceState {
        self.core.inner.lock().device_state
    }

    pub fn statusword(&self) -> u16 {
        let state = self.device_state();
        self.core.statusword_for(state)
    }

    /// 设备实际收到的控制字（按到达顺序）
    pub fn controlword_writes(&self) -> Vec<ControlwordWrite> {
        self.core.inner.lock().controlword_log.clone()
    }

    /// 设备收到的全部 SDO 写入
    pub fn sdo_writes(&self) -> Vec<SdoWrite> {
        self.core.inner.lock().sdo_log.clone()
    }

    pub fn nmt_history(&self) -> Vec<NmtState> {
        self.core.inner.lock().nmt_log.clone()
    }

    /// 已注册回调的映射名称
    pub fn subscribed_maps(&self) -> Vec<String> {
        self.maps
            .iter()
            .filter(|m| !m.subscribers.lock().is_empty())
            .map(|m| m.spec.label.clone())
            .collect()
    }

    pub fn object(&self, index: u16, subindex: u8) -> Option<u32> {
        self.core.inner.lock().objects.get(&(index, subindex)).copied()
    }

    pub fn set_object(&self, index: u16, subindex: u8, value: u32) {
        self.core.inner.lock().objects.insert((index, subindex), value);
    }

    // ------------------------------------------------------------------------
    // 故障注入
    // ------------------------------------------------------------------------

    /// 强制设备进入指定状态并广播状态字（如模拟故障）
    pub fn force_state(&self, state: DeviceState) {
        self.core.inner.lock().device_state = state;
        let _ = self.commands.send(DriveCommand::Publish);
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.core.frozen.store(frozen, Ordering::Release);
    }

    pub fn fail_next_controlwords(&self, count: u32) {
        self.core.failing_controlwords.store(count, Ordering::Release);
    }

    pub fn set_sdo_offline(&self, offline: bool) {
        self.core.sdo_offline.store(offline, Ordering::Release);
    }

    pub fn set_mode_abort(&self, code: Option<SdoAbortCode>) {
        *self.core.mode_abort.lock() = code;
    }

    pub fn set_mode_readback_follows(&self, follows: bool) {
        self.core.mode_readback_follows.store(follows, Ordering::Release);
    }

    fn check_sdo_online(&self) -> Result<(), BusError> {
        if self.core.sdo_offline.load(Ordering::Acquire) {
            return Err(BusError::communication(format!(
                "node {}: no SDO response",
                self.core.node_id
            )));
        }
        Ok(())
    }
}

impl Default for SimulatedDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulatedDrive {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(DriveCommand::Shutdown);
            let _ = worker.join();
        }
    }
}

impl RemoteNode for SimulatedDrive {
    fn node_id(&self) -> u8 {
        self.core.node_id
    }

    fn nmt(&self) -> &dyn NmtControl {
        self
    }

    fn sdo(&self) -> &dyn SdoAccessor {
        self
    }

    fn pdo(&self) -> &dyn PdoService {
        self
    }
}

impl NmtControl for SimulatedDrive {
    fn set_state(&self, state: NmtState) -> Result<(), BusError> {
        {
            let mut inner = self.core.inner.lock();
            inner.nmt = state;
            inner.nmt_log.push(state);
        }
        debug!("sim node {}: NMT -> {}", self.core.node_id, state);
        if state == NmtState::Operational {
            let _ = self.commands.send(DriveCommand::Publish);
        }
        Ok(())
    }

    fn state(&self) -> NmtState {
        self.core.inner.lock().nmt
    }
}

impl SdoAccessor for SimulatedDrive {
    fn upload(&self, index: u16, subindex: u8) -> Result<u32, BusError> {
        self.check_sdo_online()?;
        if index == OD_STATUSWORD && subindex == 0 {
            return Ok(self.statusword() as u32);
        }
        self.object(index, subindex)
            .ok_or(BusError::Aborted(SdoAbortCode::OBJECT_DOES_NOT_EXIST))
    }

    fn download(&self, index: u16, subindex: u8, value: u32) -> Result<(), BusError> {
        self.check_sdo_online()?;

        let is_controlword = index == OD_CONTROLWORD && subindex == 0;
        if is_controlword && self.core.take_controlword_failure() {
            return Err(BusError::communication("controlword SDO write failed (injected)"));
        }

        self.core.inner.lock().sdo_log.push(SdoWrite {
            index,
            subindex,
            value,
        });

        if is_controlword {
            let value = value as u16;
            self.core.record_controlword(value, Transport::Sdo);
            return self
                .commands
                .send(DriveCommand::Controlword(value))
                .map_err(|_| BusError::communication("simulated drive stopped"));
        }

        if index == self.core.mode_index && subindex == 0 {
            if let Some(code) = *self.core.mode_abort.lock() {
                return Err(BusError::Aborted(code));
            }
            if !self.core.mode_readback_follows.load(Ordering::Acquire) {
                return Ok(());
            }
        }

        self.set_object(index, subindex, value);
        Ok(())
    }
}

impl PdoService for SimulatedDrive {
    fn read_configuration(&self) -> Result<(), BusError> {
        self.check_sdo_online()?;
        self.core.inner.lock().configuration_read = true;
        Ok(())
    }

    fn maps(&self) -> Vec<Arc<dyn PdoMap>> {
        if !self.core.inner.lock().configuration_read {
            return Vec::new();
        }
        self.maps
            .iter()
            .map(|m| m.clone() as Arc<dyn PdoMap>)
            .collect()
    }
}
