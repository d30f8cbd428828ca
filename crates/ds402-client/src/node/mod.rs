//! DS402 节点控制器
//!
//! # 状态请求
//!
//! `request_state(target)` 使用两级超时：
//!
//! - **整体超时**（默认 15 s）：整个调用的期限，每轮迭代结束时检查
//! - **单步超时**（默认 1 s）：发送一个控制字后等待状态字跟随的期限；
//!   超时只记录日志，然后从新观测到的状态重新规划
//!
//! 目标为 OPERATION ENABLED 时按使能路径逐级推进；其他目标只允许一步直达，
//! 转换表中不存在的边立即返回 `IllegalTransition`，不重试。

mod mode_switch;

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use ds402_bus::RemoteNode;
use ds402_driver::{
    CommandDispatcher, SetupReport, StatusMonitor, StatusSnapshot, TransportBinding, discover,
};
use ds402_protocol::{
    DeviceState, HomingStatus, StatusWord, StatusWordBits, find_transition, next_toward_enable,
};
use tracing::{debug, info, warn};

use crate::{Ds402Error, NodeConfig, Result};

/// setup 完成后只读的绑定信息
struct Binding {
    dispatcher: CommandDispatcher,
    report: SetupReport,
}

/// DS402 节点
///
/// 当前状态由状态字回调（总线线程）写入，控制流（调用方线程）只读。
/// 每个节点同一时间只应有一个控制流。
///
/// # 示例
///
/// ```rust,ignore
/// use ds402_client::Node402;
/// use ds402_protocol::DeviceState;
///
/// let node = Node402::new(remote_node);
/// node.setup()?;
/// node.request_state(DeviceState::OperationEnabled)?;
/// ```
pub struct Node402 {
    node: Arc<dyn RemoteNode>,
    config: NodeConfig,
    monitor: Arc<StatusMonitor>,
    binding: OnceLock<Binding>,
}

impl Node402 {
    /// 使用默认配置创建
    pub fn new(node: Arc<dyn RemoteNode>) -> Self {
        Self {
            node,
            config: NodeConfig::default(),
            monitor: Arc::new(StatusMonitor::new()),
            binding: OnceLock::new(),
        }
    }

    /// 使用指定配置创建
    ///
    /// # 错误
    ///
    /// - `Ds402Error::Config`: 配置校验失败，或配置中的节点 ID 与实际节点不符
    pub fn with_config(node: Arc<dyn RemoteNode>, config: NodeConfig) -> Result<Self> {
        config.validate()?;
        if let Some(expected) = config.node_id.filter(|id| *id != node.node_id()) {
            return Err(Ds402Error::Config(format!(
                "configured node_id {} does not match node {}",
                expected,
                node.node_id()
            )));
        }
        Ok(Self {
            node,
            config,
            monitor: Arc::new(StatusMonitor::new()),
            binding: OnceLock::new(),
        })
    }

    // ==================== Setup ====================

    /// 发现 PDO 映射，注册状态回调并绑定控制字传输
    ///
    /// 重复调用返回首次的结果，不会重复注册回调。
    ///
    /// # 错误
    ///
    /// - `Ds402Error::Setup`: 没有状态字映射，或 NMT/PDO 配置读取失败
    pub fn setup(&self) -> Result<SetupReport> {
        if let Some(binding) = self.binding.get() {
            debug!("node {}: already configured", self.node_id());
            return Ok(binding.report.clone());
        }

        let (transport, report) =
            discover(self.node.as_ref(), self.monitor.clone()).map_err(Ds402Error::Setup)?;
        let dispatcher = CommandDispatcher::new(self.node.clone(), transport);

        let _ = self.binding.set(Binding {
            dispatcher,
            report: report.clone(),
        });
        Ok(report)
    }

    pub fn is_configured(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn setup_report(&self) -> Option<&SetupReport> {
        self.binding.get().map(|b| &b.report)
    }

    /// 控制字传输方式（setup 前为 `None`）
    pub fn transport(&self) -> Option<&TransportBinding> {
        self.binding.get().map(|b| b.dispatcher.binding())
    }

    // ==================== 观测 ====================

    pub fn node_id(&self) -> u8 {
        self.node.node_id()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// 当前设备状态（最近一次可解码状态字的结果）
    pub fn state(&self) -> DeviceState {
        self.monitor.state()
    }

    /// 最近一次收到的原始状态字
    pub fn last_statusword(&self) -> Option<StatusWord> {
        self.monitor.last_statusword()
    }

    /// 最近一次状态字的位域视图
    pub fn status_bits(&self) -> Option<StatusWordBits> {
        self.last_statusword().map(StatusWord::bits)
    }

    /// 最近一次状态字中的回零状态
    pub fn homing_status(&self) -> Option<HomingStatus> {
        self.last_statusword().and_then(StatusWord::homing_status)
    }

    pub fn status_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.monitor.snapshot()
    }

    // ==================== 状态请求 ====================

    /// 请求设备进入目标状态
    ///
    /// 请求当前状态是空操作：不发送任何控制字。
    ///
    /// # 错误
    ///
    /// - `Ds402Error::NotConfigured`: 尚未 setup
    /// - `Ds402Error::IllegalTransition`: 当前状态到下一状态的边不存在
    /// - `Ds402Error::OverallTimeout`: 整体期限内未到达目标
    pub fn request_state(&self, target: DeviceState) -> Result<()> {
        let node_id = self.node_id();
        let dispatcher = &self
            .binding
            .get()
            .ok_or(Ds402Error::NotConfigured { node_id })?
            .dispatcher;

        let sm = &self.config.state_machine;
        let deadline = Instant::now() + sm.overall_timeout;
        let mut current = self.state();

        while current != target {
            let next = if target == DeviceState::OperationEnabled {
                next_toward_enable(current)
            } else {
                target
            };
            let transition = find_transition(current, next)?;
            debug!(
                "node {}: {} -> {} (transition {}, {})",
                node_id, current, next, transition.number, transition.code
            );

            if let Err(e) = dispatcher.send(transition.code) {
                warn!(
                    "node {}: failed to send {}: {}",
                    node_id,
                    transition.code,
                    Ds402Error::from(e)
                );
            }

            let step_deadline = (Instant::now() + sm.step_timeout).min(deadline);
            if !wait_until(step_deadline, sm.poll_interval, || self.state() == next) {
                warn!(
                    "node {}: {}",
                    node_id,
                    Ds402Error::StepTimeout {
                        from: current,
                        to: next,
                        timeout_ms: sm.step_timeout.as_millis() as u64,
                    }
                );
            }

            current = self.state();
            if Instant::now() >= deadline {
                return Err(Ds402Error::OverallTimeout {
                    target,
                    observed: current,
                    timeout_ms: sm.overall_timeout.as_millis() as u64,
                });
            }
        }

        Ok(())
    }

    /// 故障复位
    ///
    /// 处于 FAULT 时请求 OPERATION ENABLED（首步即 fault reset）；
    /// 否则不做任何事。
    pub fn reset_from_fault(&self) -> Result<()> {
        let state = self.state();
        info!("node {}: state at fault reset: {}", self.node_id(), state);
        if state == DeviceState::Fault {
            self.request_state(DeviceState::OperationEnabled)
        } else {
            info!("node {}: not in FAULT, nothing to reset", self.node_id());
            Ok(())
        }
    }

    /// 回零
    ///
    /// 回零流程尚未实现；可通过 [`homing_status`](Self::homing_status) 观测设备侧状态。
    pub fn homing(&self) -> Result<()> {
        warn!("node {}: homing procedure is not implemented", self.node_id());
        Ok(())
    }
}

impl std::fmt::Debug for Node402 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node402")
            .field("node_id", &self.node_id())
            .field("state", &self.state())
            .field("transport", &self.transport())
            .finish()
    }
}

/// 轮询直到条件成立或到达期限
///
/// 返回条件是否在期限内成立。每次轮询之间让出 `poll_interval`（不超过剩余时间）。
fn wait_until(deadline: Instant, poll_interval: Duration, mut condition: impl FnMut() -> bool) -> bool {
    loop {
        if condition() {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        spin_sleep::sleep(poll_interval.min(remaining));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds402_bus::mock::SimulatedDrive;

    fn fast_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.state_machine.overall_timeout = Duration::from_millis(300);
        config.state_machine.step_timeout = Duration::from_millis(50);
        config
    }

    #[test]
    fn test_wait_until() {
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(wait_until(deadline, Duration::from_micros(100), || true));

        let start = Instant::now();
        let deadline = start + Duration::from_millis(20);
        assert!(!wait_until(deadline, Duration::from_millis(1), || false));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_request_before_setup() {
        let node = Node402::new(Arc::new(SimulatedDrive::new()));
        assert!(!node.is_configured());
        let err = node.request_state(DeviceState::OperationEnabled).unwrap_err();
        assert_eq!(err, Ds402Error::NotConfigured { node_id: 1 });
        assert!(err.is_fatal());
    }

    #[test]
    fn test_node_id_mismatch_rejected() {
        let config = NodeConfig {
            node_id: Some(9),
            ..Default::default()
        };
        let err = Node402::with_config(Arc::new(SimulatedDrive::new()), config).unwrap_err();
        assert!(matches!(err, Ds402Error::Config(_)));
    }

    #[test]
    fn test_setup_is_idempotent() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = Node402::with_config(drive.clone(), fast_config()).unwrap();
        let first = node.setup().unwrap();
        let second = node.setup().unwrap();
        assert_eq!(first, second);
        assert_eq!(drive.subscribed_maps(), vec!["TxPDO1".to_string()]);
        assert!(node.is_configured());
        assert_eq!(node.transport().and_then(|t| t.mapping()), Some("RxPDO1"));
    }

    #[test]
    fn test_initial_state_is_not_ready() {
        let node = Node402::new(Arc::new(SimulatedDrive::new()));
        assert_eq!(node.state(), DeviceState::NotReadyToSwitchOn);
        assert_eq!(node.last_statusword(), None);
        assert_eq!(node.status_bits(), None);
        assert_eq!(node.homing_status(), None);
    }

    #[test]
    fn test_homing_stub_sends_nothing() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = Node402::new(drive.clone());
        node.setup().unwrap();
        node.homing().unwrap();
        assert!(drive.controlword_writes().is_empty());
    }
}
