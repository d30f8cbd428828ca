//! PDO 发现与传输绑定
//!
//! # 流程
//!
//! 1. NMT → PRE-OPERATIONAL
//! 2. 从设备读取 PDO 配置
//! 3. 按顺序扫描已启用的映射：
//!    - 第一个含 "Statusword" 的映射注册状态回调
//!    - 第一个含 "Controlword" 的映射成为控制字传输通道
//! 4. 没有状态字映射 → 错误（节点保持 PRE-OPERATIONAL）
//! 5. NMT → OPERATIONAL

use std::fmt;
use std::sync::Arc;

use ds402_bus::{NmtState, PdoCallback, RemoteNode};
use ds402_protocol::{FIELD_CONTROLWORD, FIELD_STATUSWORD};
use tracing::{debug, info};

use crate::{DriverError, StatusMonitor, TransportBinding};

/// 控制字传输方式（报告用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlwordTransport {
    Pdo { mapping: String },
    Sdo,
}

impl fmt::Display for ControlwordTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdo { mapping } => write!(f, "PDO ({})", mapping),
            Self::Sdo => f.write_str("SDO"),
        }
    }
}

/// setup 结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub node_id: u8,
    /// 注册了状态回调的映射
    pub statusword_mapping: String,
    pub controlword_transport: ControlwordTransport,
}

/// 扫描 PDO 配置并绑定状态回调与控制字传输
///
/// # 错误
///
/// - `DriverError::Bus`: NMT 切换或 PDO 配置读取失败
/// - `DriverError::NoStatuswordMapping`: 没有任何已启用映射携带状态字
pub fn discover(
    node: &dyn RemoteNode,
    monitor: Arc<StatusMonitor>,
) -> Result<(TransportBinding, SetupReport), DriverError> {
    let node_id = node.node_id();

    node.nmt().set_state(NmtState::PreOperational)?;
    node.pdo().read_configuration()?;

    let mut statusword_mapping = None;
    let mut controlword_map = None;

    for map in node.pdo().maps() {
        if !map.is_enabled() {
            debug!("node {}: skipping disabled mapping {}", node_id, map.label());
            continue;
        }
        if statusword_mapping.is_none() && map.contains(FIELD_STATUSWORD) {
            map.subscribe(monitor.clone() as Arc<dyn PdoCallback>);
            statusword_mapping = Some(map.label().to_string());
        }
        if controlword_map.is_none() && map.contains(FIELD_CONTROLWORD) {
            controlword_map = Some(map);
        }
    }

    let (binding, controlword_transport) = match controlword_map {
        Some(map) => {
            let mapping = map.label().to_string();
            info!("node {}: controlword will be sent via PDO {}", node_id, mapping);
            (TransportBinding::Pdo(map), ControlwordTransport::Pdo { mapping })
        },
        None => {
            info!("node {}: no controlword PDO mapping, falling back to SDO", node_id);
            (TransportBinding::Sdo, ControlwordTransport::Sdo)
        },
    };

    let statusword_mapping =
        statusword_mapping.ok_or(DriverError::NoStatuswordMapping { node_id })?;
    info!(
        "node {}: statusword received via PDO {}",
        node_id, statusword_mapping
    );

    node.nmt().set_state(NmtState::Operational)?;

    Ok((
        binding,
        SetupReport {
            node_id,
            statusword_mapping,
            controlword_transport,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ds402_bus::mock::{PdoMapSpec, SimulatedDrive};

    #[test]
    fn test_default_layout_binds_pdo() {
        let drive = SimulatedDrive::new();
        let monitor = Arc::new(StatusMonitor::new());
        let (binding, report) = discover(&drive, monitor).unwrap();

        assert_eq!(binding.mapping(), Some("RxPDO1"));
        assert_eq!(report.statusword_mapping, "TxPDO1");
        assert_eq!(
            report.controlword_transport,
            ControlwordTransport::Pdo {
                mapping: "RxPDO1".to_string()
            }
        );
        assert_eq!(
            drive.nmt_history(),
            vec![NmtState::PreOperational, NmtState::Operational]
        );
    }

    #[test]
    fn test_disabled_mappings_are_skipped() {
        let drive = SimulatedDrive::builder()
            .maps(vec![
                PdoMapSpec::new("TxPDO1", false, &["Statusword"]),
                PdoMapSpec::new("TxPDO2", true, &["Statusword", "Position actual value"]),
                PdoMapSpec::new("TxPDO3", true, &["Statusword"]),
                PdoMapSpec::new("RxPDO1", false, &["Controlword"]),
            ])
            .build();
        let monitor = Arc::new(StatusMonitor::new());
        let (binding, report) = discover(&drive, monitor).unwrap();

        assert_eq!(report.statusword_mapping, "TxPDO2");
        assert!(!binding.is_pdo());
        assert_eq!(report.controlword_transport, ControlwordTransport::Sdo);
        // 只有第一个匹配的映射注册了回调
        assert_eq!(drive.subscribed_maps(), vec!["TxPDO2".to_string()]);
    }

    #[test]
    fn test_missing_statusword_mapping_is_fatal() {
        let drive = SimulatedDrive::builder()
            .node_id(7)
            .maps(vec![PdoMapSpec::new("RxPDO1", true, &["Controlword"])])
            .build();
        let monitor = Arc::new(StatusMonitor::new());
        let err = discover(&drive, monitor).unwrap_err();

        assert_eq!(err, DriverError::NoStatuswordMapping { node_id: 7 });
        assert_eq!(drive.nmt_history(), vec![NmtState::PreOperational]);
    }

    #[test]
    fn test_configuration_read_failure() {
        let drive = SimulatedDrive::new();
        drive.set_sdo_offline(true);
        let monitor = Arc::new(StatusMonitor::new());
        let err = discover(&drive, monitor).unwrap_err();
        assert!(matches!(err, DriverError::Bus(ref e) if e.is_communication()));
    }
}
