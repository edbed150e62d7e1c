//! Bridge configuration file
//!
//! The configuration is a single JSON object. Scalar keys configure the
//! connection; every array-valued key is a device group named after its
//! device type:
//!
//! ```json
//! {
//!   "name": "Gateway",
//!   "host": "192.168.1.50",
//!   "port": 41794,
//!   "reconnect_delay_ms": 5000,
//!   "WindowCovering": [
//!     { "id": 5, "name": "Office Shade" }
//!   ]
//! }
//! ```

use gateway_platform::{DeviceConfig, PlatformError};
use gateway_protocol::{Framing, ProtocolConfig};
use gateway_transport::TransportConfig;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid device configuration: {0}")]
    Devices(#[from] PlatformError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_name() -> String {
    "Gateway".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_max_residual_len() -> usize {
    ProtocolConfig::default().max_residual_len
}

/// Complete bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Platform name used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Gateway host name or IP address
    pub host: String,

    /// Gateway TCP port
    pub port: u16,

    /// Delay between reconnection attempts
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Pause after restoring cached accessories, before discovery
    #[serde(default)]
    pub settle_delay_ms: u64,

    /// How incoming chunks are framed into messages
    #[serde(default)]
    pub framing: Framing,

    /// Largest partial message kept between chunks
    #[serde(default = "default_max_residual_len")]
    pub max_residual_len: usize,

    /// Device groups, from every array-valued key
    #[serde(skip)]
    pub devices: DeviceConfig,
}

impl BridgeConfig {
    /// Read and validate the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let devices = DeviceConfig::from_value(&value)?;
        let mut config: BridgeConfig = serde_json::from_value(value)?;
        config.devices = devices;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transport_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.protocol_config()
            .validate()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.host.clone(), self.port)
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
    }

    pub fn protocol_config(&self) -> ProtocolConfig {
        ProtocolConfig {
            framing: self.framing,
            max_residual_len: self.max_residual_len,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_minimal_config() {
        let config = BridgeConfig::from_json(r#"{"host": "10.0.0.5", "port": 41794}"#).unwrap();
        assert_eq!(config.name, "Gateway");
        assert_eq!(config.reconnect_delay_ms, 5000);
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.framing, Framing::Buffered);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_device_groups_are_collected() {
        let config = BridgeConfig::from_json(
            r#"{
                "platform": "GatewayBridge",
                "host": "10.0.0.5",
                "port": 41794,
                "framing": "per_chunk",
                "WindowCovering": [{"id": 5, "name": "Shade"}],
                "Light": [{"id": "a", "name": "Lamp"}, {"id": "b", "name": "Strip"}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.framing, Framing::PerChunk);
        assert_eq!(config.devices.device_count(), 3);
        assert!(config.devices.group("WindowCovering").is_some());
    }

    #[test]
    fn test_transport_config_mapping() {
        let config = BridgeConfig::from_json(
            r#"{"host": "gw.local", "port": 8000, "reconnect_delay_ms": 250}"#,
        )
        .unwrap();
        let transport = config.transport_config();
        assert_eq!(transport.address(), "gw.local:8000");
        assert_eq!(transport.reconnect_delay, Duration::from_millis(250));
    }

    #[rstest]
    #[case::missing_host(r#"{"port": 1}"#)]
    #[case::empty_host(r#"{"host": "", "port": 1}"#)]
    #[case::zero_port(r#"{"host": "h", "port": 0}"#)]
    #[case::zero_residual(r#"{"host": "h", "port": 1, "max_residual_len": 0}"#)]
    #[case::bad_device(r#"{"host": "h", "port": 1, "Light": [{"name": "no id"}]}"#)]
    #[case::not_json("host = h")]
    fn test_invalid_configs(#[case] text: &str) {
        assert!(BridgeConfig::from_json(text).is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let error = BridgeConfig::load(Path::new("/nonexistent/bridge.json")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/bridge.json"));
    }
}
