//! Bridge runtime: startup sequence and the dispatch loop

use anyhow::{Context, Result};
use event_bus::EventBus;
use gateway_platform::{
    BridgePlatform, CommandSender, DiscoveryReport, FileAccessoryCache, HandlerRegistry,
};
use gateway_transport::{TcpTransport, TransportEvent};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;

/// A running bridge
pub struct Bridge {
    platform: BridgePlatform,
    transport: Arc<TcpTransport>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    cache: Arc<FileAccessoryCache>,
    messages: u64,
}

impl Bridge {
    /// Start the bridge
    ///
    /// Opens the accessory cache, connects the transport, restores cached
    /// accessories, waits the configured settle delay and runs discovery.
    pub async fn start(
        config: &BridgeConfig,
        cache_path: &Path,
    ) -> Result<(Self, DiscoveryReport)> {
        info!(
            name = %config.name,
            address = %config.transport_config().address(),
            "Starting bridge"
        );

        let cache = Arc::new(FileAccessoryCache::open(cache_path).with_context(|| {
            format!("Failed to open accessory cache {}", cache_path.display())
        })?);

        let (transport, events) = TcpTransport::spawn(config.transport_config())
            .context("Failed to start gateway transport")?;
        let transport = Arc::new(transport);

        let mut platform = BridgePlatform::new(
            cache.clone(),
            EventBus::new(),
            CommandSender::new(transport.clone()),
            HandlerRegistry::with_defaults(),
            config.devices.clone(),
            config.protocol_config(),
        )
        .context("Failed to create platform")?;

        for accessory in cache.load() {
            platform.configure_accessory(accessory);
        }

        let settle = config.settle_delay();
        if !settle.is_zero() {
            debug!(delay = ?settle, "Waiting before discovery");
            tokio::time::sleep(settle).await;
        }

        let report = platform.on_ready().unwrap_or_default();
        if !report.is_clean() {
            warn!(%report, "Discovery finished with problems");
        }

        Ok((
            Self {
                platform,
                transport,
                events,
                cache,
                messages: 0,
            },
            report,
        ))
    }

    /// Wait for the next transport event and apply it
    ///
    /// Chunks are decoded and published. A partial message never carries
    /// over a reconnect: it is flushed when the connection drops and the
    /// decoder is reset when a new one comes up. Returns the number of
    /// messages published, or `None` once the transport has stopped, after
    /// flushing anything still buffered.
    pub async fn next_event(&mut self) -> Option<usize> {
        let published = match self.events.recv().await {
            Some(TransportEvent::Chunk(chunk)) => self.platform.handle_data(&chunk),
            Some(TransportEvent::Disconnected) => {
                debug!("Connection lost, flushing partial message");
                self.platform.flush_data()
            }
            Some(TransportEvent::Connected) => {
                self.platform.reset_decoder();
                0
            }
            None => {
                self.flush();
                return None;
            }
        };
        self.messages += published as u64;
        Some(published)
    }

    fn flush(&mut self) {
        self.messages += self.platform.flush_data() as u64;
    }

    /// Dispatch transport events until `shutdown` completes or the transport stops
    ///
    /// Returns the total number of messages published.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                published = self.next_event() => {
                    if published.is_none() {
                        warn!("Transport stopped");
                        break;
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.flush();
        let messages = self.messages;
        self.shutdown().await;
        Ok(messages)
    }

    /// Stop the transport, publish any buffered message and release handlers
    pub async fn shutdown(mut self) {
        self.flush();
        let Bridge {
            platform,
            transport,
            messages,
            ..
        } = self;
        drop(platform);
        transport.shutdown().await;
        info!(messages, "Bridge stopped");
    }

    pub fn platform(&self) -> &BridgePlatform {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut BridgePlatform {
        &mut self.platform
    }

    pub fn cache(&self) -> &FileAccessoryCache {
        &self.cache
    }

    /// Messages published since start
    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn is_connected(&self) -> bool {
        use gateway_transport::Transport;
        self.transport.is_connected()
    }
}
