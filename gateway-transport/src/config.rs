//! Configuration types for the gateway transport

use std::time::Duration;

use crate::error::{Result, TransportError};

/// Configuration for [`TcpTransport`](crate::TcpTransport)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Gateway host name or IP address
    pub host: String,

    /// Gateway TCP port
    pub port: u16,

    /// Whether to reconnect after the connection drops
    /// Default: true
    pub reconnect: bool,

    /// Fixed delay between connection attempts
    /// Default: 5 seconds
    pub reconnect_delay: Duration,

    /// Timeout for a single connection attempt
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Size of the socket read buffer
    /// Default: 4096
    pub read_buffer_size: usize,
}

impl TransportConfig {
    /// Create a config for `host:port` with default settings
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reconnect: true,
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            read_buffer_size: 4096,
        }
    }

    /// Connect once and stop when the connection ends
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect = false;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Socket address string, bracketing bare IPv6 literals
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TransportError::Configuration(
                "Gateway host must not be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(TransportError::Configuration(
                "Gateway port must be greater than 0".to_string(),
            ));
        }

        if self.read_buffer_size == 0 {
            return Err(TransportError::Configuration(
                "Read buffer size must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout == Duration::ZERO {
            return Err(TransportError::Configuration(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::new("10.0.0.5", 41794);
        assert!(config.reconnect);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.read_buffer_size, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address() {
        assert_eq!(TransportConfig::new("10.0.0.5", 80).address(), "10.0.0.5:80");
        assert_eq!(TransportConfig::new("gateway.local", 80).address(), "gateway.local:80");
        assert_eq!(TransportConfig::new("fe80::1", 80).address(), "[fe80::1]:80");
        assert_eq!(TransportConfig::new("[fe80::1]", 80).address(), "[fe80::1]:80");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TransportConfig::new("", 80).validate().is_err());
        assert!(TransportConfig::new("host", 0).validate().is_err());

        let mut config = TransportConfig::new("host", 80);
        config.read_buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = TransportConfig::new("host", 80);
        config.connect_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = TransportConfig::new("host", 80)
            .without_reconnect()
            .with_reconnect_delay(Duration::from_millis(250));
        assert!(!config.reconnect);
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
    }
}
