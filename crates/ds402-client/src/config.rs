//! 节点配置
//!
//! 所有配置都有默认值；也可以从 TOML 文件加载。文件中的时长以整数毫秒/微秒书写：
//!
//! ```toml
//! node_id = 3
//!
//! [state_machine]
//! overall_timeout_ms = 15000
//! step_timeout_ms = 1000
//! poll_interval_us = 100
//!
//! [mode_switch]
//! confirm_timeout_ms = 500
//! poll_interval_us = 100
//! mode_index = 0x6502
//! mode_subindex = 0
//! ```

use std::path::Path;
use std::time::Duration;

use ds402_protocol::OD_SUPPORTED_DRIVE_MODES;
use serde::{Deserialize, Serialize};

use crate::{Ds402Error, Result};

// ============================================================================
// 状态机配置
// ============================================================================

/// 状态请求配置（两级超时）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StateMachineFile", into = "StateMachineFile")]
pub struct StateMachineConfig {
    /// 整个 `request_state()` 调用的超时
    pub overall_timeout: Duration,
    /// 单步转换等待状态字跟随的超时
    pub step_timeout: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(15),
            step_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_micros(100),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StateMachineFile {
    overall_timeout_ms: u64,
    step_timeout_ms: u64,
    poll_interval_us: u64,
}

impl Default for StateMachineFile {
    fn default() -> Self {
        StateMachineConfig::default().into()
    }
}

impl From<StateMachineFile> for StateMachineConfig {
    fn from(file: StateMachineFile) -> Self {
        Self {
            overall_timeout: Duration::from_millis(file.overall_timeout_ms),
            step_timeout: Duration::from_millis(file.step_timeout_ms),
            poll_interval: Duration::from_micros(file.poll_interval_us),
        }
    }
}

impl From<StateMachineConfig> for StateMachineFile {
    fn from(config: StateMachineConfig) -> Self {
        Self {
            overall_timeout_ms: config.overall_timeout.as_millis() as u64,
            step_timeout_ms: config.step_timeout.as_millis() as u64,
            poll_interval_us: config.poll_interval.as_micros() as u64,
        }
    }
}

// ============================================================================
// 运行模式切换配置
// ============================================================================

/// 运行模式切换配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ModeSwitchFile", into = "ModeSwitchFile")]
pub struct ModeSwitchConfig {
    /// 写入后等待回读确认的超时
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    /// 运行模式对象索引
    pub mode_index: u16,
    pub mode_subindex: u8,
}

impl Default for ModeSwitchConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_micros(100),
            mode_index: OD_SUPPORTED_DRIVE_MODES,
            mode_subindex: 0,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ModeSwitchFile {
    confirm_timeout_ms: u64,
    poll_interval_us: u64,
    mode_index: u16,
    mode_subindex: u8,
}

impl Default for ModeSwitchFile {
    fn default() -> Self {
        ModeSwitchConfig::default().into()
    }
}

impl From<ModeSwitchFile> for ModeSwitchConfig {
    fn from(file: ModeSwitchFile) -> Self {
        Self {
            confirm_timeout: Duration::from_millis(file.confirm_timeout_ms),
            poll_interval: Duration::from_micros(file.poll_interval_us),
            mode_index: file.mode_index,
            mode_subindex: file.mode_subindex,
        }
    }
}

impl From<ModeSwitchConfig> for ModeSwitchFile {
    fn from(config: ModeSwitchConfig) -> Self {
        Self {
            confirm_timeout_ms: config.confirm_timeout.as_millis() as u64,
            poll_interval_us: config.poll_interval.as_micros() as u64,
            mode_index: config.mode_index,
            mode_subindex: config.mode_subindex,
        }
    }
}

// ============================================================================
// 节点配置
// ============================================================================

/// 节点配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// 期望的节点 ID；设置后与实际节点不符时拒绝创建
    pub node_id: Option<u8>,
    pub state_machine: StateMachineConfig,
    pub mode_switch: ModeSwitchConfig,
}

impl NodeConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Ds402Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Ds402Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Ds402Error::Config(e.to_string()))
    }

    /// 校验配置
    ///
    /// # 错误
    ///
    /// - 任一超时为零
    /// - 单步超时大于整体超时
    /// - 节点 ID 不在 1..=127 范围内
    pub fn validate(&self) -> Result<()> {
        let sm = &self.state_machine;
        if sm.overall_timeout.is_zero() {
            return Err(Ds402Error::Config("overall_timeout must be non-zero".into()));
        }
        if sm.step_timeout.is_zero() {
            return Err(Ds402Error::Config("step_timeout must be non-zero".into()));
        }
        if sm.step_timeout > sm.overall_timeout {
            return Err(Ds402Error::Config(format!(
                "step_timeout ({:?}) exceeds overall_timeout ({:?})",
                sm.step_timeout, sm.overall_timeout
            )));
        }
        if self.mode_switch.confirm_timeout.is_zero() {
            return Err(Ds402Error::Config("confirm_timeout must be non-zero".into()));
        }
        if let Some(id) = self.node_id.filter(|id| !(1..=127).contains(id)) {
            return Err(Ds402Error::Config(format!("node_id {} out of range 1..=127", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.state_machine.overall_timeout, Duration::from_secs(15));
        assert_eq!(config.state_machine.step_timeout, Duration::from_secs(1));
        assert_eq!(config.state_machine.poll_interval, Duration::from_micros(100));
        assert_eq!(config.mode_switch.confirm_timeout, Duration::from_millis(500));
        assert_eq!(config.mode_switch.mode_index, 0x6502);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = NodeConfig::from_toml_str(
            r#"
            node_id = 5

            [state_machine]
            step_timeout_ms = 250

            [mode_switch]
            mode_index = 0x6060
            "#,
        )
        .unwrap();

        assert_eq!(config.node_id, Some(5));
        assert_eq!(config.state_machine.step_timeout, Duration::from_millis(250));
        // 未写出的字段取默认值
        assert_eq!(config.state_machine.overall_timeout, Duration::from_secs(15));
        assert_eq!(config.mode_switch.mode_index, 0x6060);
        assert_eq!(config.mode_switch.confirm_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_reject_unknown_field() {
        let err = NodeConfig::from_toml_str("[state_machine]\nstep_timeout = 3\n").unwrap_err();
        assert!(matches!(err, Ds402Error::Config(_)));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = NodeConfig::default();
        config.state_machine.step_timeout = Duration::from_secs(20);
        assert!(config.validate().unwrap_err().to_string().contains("exceeds"));

        let mut config = NodeConfig::default();
        config.state_machine.overall_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.mode_switch.confirm_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let config = NodeConfig {
            node_id: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let mut config = NodeConfig::default();
        config.state_machine.overall_timeout = Duration::from_millis(1500);
        config.mode_switch.mode_subindex = 1;
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("overall_timeout_ms = 1500"));
        assert_eq!(NodeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[state_machine]\noverall_timeout_ms = 3000").unwrap();
        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.state_machine.overall_timeout, Duration::from_secs(3));

        let err = NodeConfig::load("/nonexistent/ds402.toml").unwrap_err();
        assert!(err.is_fatal());
    }
}
