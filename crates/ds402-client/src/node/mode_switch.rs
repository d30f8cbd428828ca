//! 运行模式切换
//!
//! 1. 若处于 OPERATION ENABLED，先降到 SWITCHED ON（记住原状态）
//! 2. SDO 写入运行模式对象
//! 3. 在 `confirm_timeout` 内轮询回读，直到设备报告新模式
//! 4. 无论确认成功还是超时，恢复原状态
//!
//! 写入时的通信失败只记录日志；SDO 中止会上报，唯一例外是
//! 0x0601_0002（部分设备写入成功后仍报告只读）。

use std::time::Instant;

use ds402_bus::{BusError, SdoAbortCode};
use ds402_protocol::{DeviceState, OperationMode};
use tracing::{debug, error, info, trace, warn};

use super::{Node402, wait_until};
use crate::{Ds402Error, Result};

impl Node402 {
    /// 切换运行模式
    ///
    /// # 错误
    ///
    /// - `Ds402Error::DeviceAbort`: 设备中止了写入（0x0601_0002 除外）
    /// - 离开/恢复 OPERATION ENABLED 时的状态请求错误
    pub fn change_mode(&self, mode: OperationMode) -> Result<()> {
        let node_id = self.node_id();
        let original = self.state();
        let leave_enabled = original == DeviceState::OperationEnabled;

        if leave_enabled {
            debug!("node {}: leaving {} to change mode", node_id, original);
            self.request_state(DeviceState::SwitchedOn)?;
        }

        let written = self.write_mode(mode);
        if matches!(written, Ok(true)) && !self.confirm_mode(mode) {
            error!(
                "node {}: timeout setting the new mode of operation ({})",
                node_id, mode
            );
        }

        let restored = if leave_enabled {
            self.request_state(original)
        } else {
            Ok(())
        };

        if let (Err(_), Err(restore_err)) = (&written, &restored) {
            warn!(
                "node {}: failed to restore {} after mode write error: {}",
                node_id, original, restore_err
            );
        }
        written?;
        restored?;

        info!("node {}: mode of operation is {}", node_id, mode);
        Ok(())
    }

    /// 读取设备当前运行模式
    pub fn operation_mode(&self) -> Result<OperationMode> {
        let cfg = &self.config.mode_switch;
        let raw = self.node.sdo().upload(cfg.mode_index, cfg.mode_subindex)?;
        Ok(OperationMode::try_from(raw)?)
    }

    /// 写入运行模式；返回是否需要等待回读确认
    fn write_mode(&self, mode: OperationMode) -> Result<bool> {
        let node_id = self.node_id();
        let cfg = &self.config.mode_switch;

        match self
            .node
            .sdo()
            .download(cfg.mode_index, cfg.mode_subindex, mode.bits())
        {
            Ok(()) => Ok(true),
            Err(BusError::Aborted(code)) if code == SdoAbortCode::WRITE_READ_ONLY => {
                debug!(
                    "node {}: ignoring abort {} while writing mode {}",
                    node_id, code, mode
                );
                Ok(true)
            },
            Err(BusError::Aborted(code)) => {
                error!(
                    "node {}: error setting object 0x{:04X}:{}: {}",
                    node_id, cfg.mode_index, cfg.mode_subindex, code
                );
                Err(Ds402Error::DeviceAbort(code))
            },
            Err(e) => {
                warn!("node {}: failed to write mode {}: {}", node_id, mode, e);
                Ok(false)
            },
        }
    }

    /// 轮询回读直到设备报告新模式
    fn confirm_mode(&self, mode: OperationMode) -> bool {
        let cfg = &self.config.mode_switch;
        let deadline = Instant::now() + cfg.confirm_timeout;
        let sdo = self.node.sdo();

        wait_until(deadline, cfg.poll_interval, || {
            match sdo.upload(cfg.mode_index, cfg.mode_subindex) {
                Ok(raw) => raw == mode.bits(),
                Err(e) => {
                    trace!("node {}: mode readback failed: {}", self.node_id(), e);
                    false
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeConfig;
    use ds402_bus::mock::SimulatedDrive;
    use ds402_protocol::OD_SUPPORTED_DRIVE_MODES;
    use std::sync::Arc;
    use std::time::Duration;

    fn configured(drive: &Arc<SimulatedDrive>) -> Node402 {
        let mut config = NodeConfig::default();
        config.state_machine.overall_timeout = Duration::from_secs(2);
        config.state_machine.step_timeout = Duration::from_millis(200);
        config.mode_switch.confirm_timeout = Duration::from_millis(50);
        let node = Node402::with_config(drive.clone(), config).unwrap();
        node.setup().unwrap();
        node
    }

    #[test]
    fn test_change_mode_outside_enabled_keeps_state() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = configured(&drive);

        node.change_mode(OperationMode::ProfiledVelocity).unwrap();
        assert_eq!(drive.object(OD_SUPPORTED_DRIVE_MODES, 0), Some(0x04));
        assert_eq!(node.operation_mode().unwrap(), OperationMode::ProfiledVelocity);
        // 不处于 OPERATION ENABLED 时不发送控制字
        assert!(drive.controlword_writes().is_empty());
    }

    #[test]
    fn test_read_only_abort_is_swallowed() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = configured(&drive);
        drive.set_mode_abort(Some(SdoAbortCode::WRITE_READ_ONLY));

        assert!(node.change_mode(OperationMode::Homing).is_ok());
    }

    #[test]
    fn test_other_abort_is_reported() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = configured(&drive);
        drive.set_mode_abort(Some(SdoAbortCode::VALUE_RANGE_EXCEEDED));

        let err = node.change_mode(OperationMode::Homing).unwrap_err();
        assert!(err.is_abort_code(SdoAbortCode::VALUE_RANGE_EXCEEDED));
    }

    #[test]
    fn test_communication_failure_is_absorbed() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = configured(&drive);
        drive.set_sdo_offline(true);

        assert!(node.change_mode(OperationMode::CyclicSynchronousPosition).is_ok());
        assert!(drive.sdo_writes().is_empty());
    }

    #[test]
    fn test_invalid_readback_value() {
        let drive = Arc::new(SimulatedDrive::new());
        let node = configured(&drive);
        drive.set_object(OD_SUPPORTED_DRIVE_MODES, 0, 0x03);

        let err = node.operation_mode().unwrap_err();
        assert!(matches!(err, Ds402Error::Protocol(_)));
    }
}
