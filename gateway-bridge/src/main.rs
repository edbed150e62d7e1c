use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use gateway_bridge::logging::{init_logging, resolve_mode};
use gateway_bridge::{Args, Bridge, BridgeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mode = resolve_mode(args.log_mode)?;
    init_logging(mode)?;

    let mut config = BridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    let cache_path = args.cache_path()?;
    info!(
        cache = %cache_path.display(),
        devices = config.devices.device_count(),
        "Configuration loaded"
    );

    let (bridge, report) = Bridge::start(&config, &cache_path).await?;
    info!(%report, "Bridge ready");

    let messages = bridge.run_until(shutdown_signal()).await?;
    info!(messages, "Exiting");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
