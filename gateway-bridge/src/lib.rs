//! Control gateway bridge daemon
//!
//! Wires the workspace crates into a runnable bridge: configuration loading,
//! logging, the accessory cache, the TCP transport and the platform.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod logging;

pub use bridge::Bridge;
pub use cli::Args;
pub use config::{BridgeConfig, ConfigError};
pub use logging::{init_logging, LoggingMode};
