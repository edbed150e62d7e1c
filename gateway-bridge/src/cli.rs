//! Command line arguments

use anyhow::{anyhow, Result};
use clap::Parser;
use gateway_platform::FileAccessoryCache;
use std::path::PathBuf;

use crate::logging::LoggingMode;

/// Control gateway bridge
///
/// Connects to the control gateway, keeps the accessory host in step with the
/// configured devices, and relays status and commands between them.
#[derive(Parser, Debug)]
#[command(name = "gateway-bridge")]
#[command(version)]
pub struct Args {
    /// Path to the bridge configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the accessory cache (default: user data directory)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Logging mode (overrides BRIDGE_LOG_MODE)
    #[arg(long, value_enum)]
    pub log_mode: Option<LoggingMode>,

    /// Override the gateway host from the configuration file
    #[arg(long)]
    pub host: Option<String>,

    /// Override the gateway port from the configuration file
    #[arg(long)]
    pub port: Option<u16>,
}

impl Args {
    /// Accessory cache location, falling back to the platform default
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache {
            Some(path) => Ok(path.clone()),
            None => FileAccessoryCache::default_path()
                .ok_or_else(|| anyhow!("No data directory available; pass --cache")),
        }
    }
}
