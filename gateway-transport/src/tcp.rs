//! TCP client transport with fixed-delay reconnection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::{Transport, TransportEvent};

/// TCP connection to the gateway.
///
/// `TcpTransport` owns a background task that connects to the configured
/// address and writes outbound text to the socket. The channel returned by
/// [`spawn`](Self::spawn) carries a [`TransportEvent::Connected`] for every
/// established socket, each read as a [`TransportEvent::Chunk`], and a
/// [`TransportEvent::Disconnected`] when the socket is lost. The task then
/// waits `reconnect_delay` and tries again until
/// [`shutdown`](Self::shutdown) is called or the transport is dropped.
///
/// Reads are decoded as UTF-8. A multi-byte character split across two reads
/// is held back until it is complete; invalid bytes become U+FFFD.
pub struct TcpTransport {
    /// Outbound text for the connection task
    outbound: mpsc::UnboundedSender<String>,
    /// Set while a socket is established
    connected: Arc<AtomicBool>,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
    /// Connection task handle, taken on shutdown
    task: Mutex<Option<JoinHandle<()>>>,
    address: String,
}

/// Why a single connection ended
enum Served {
    /// Shutdown requested or transport dropped
    Shutdown,
    /// Nobody is listening for events any more
    ReceiverDropped,
    /// Socket closed or failed
    Disconnected(String),
}

impl TcpTransport {
    /// Validate `config` and start the connection task.
    ///
    /// Must be called from within a tokio runtime. Returns the transport and
    /// the receiver for connection events. The receiver yields `None` once
    /// the task has stopped.
    pub fn spawn(
        config: TransportConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        config.validate()?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(false));
        let address = config.address();

        let task = tokio::spawn(Self::run(
            config,
            outbound_rx,
            event_tx,
            Arc::clone(&connected),
            shutdown_rx,
        ));

        Ok((
            Self {
                outbound: outbound_tx,
                connected,
                shutdown_tx,
                task: Mutex::new(Some(task)),
                address,
            },
            event_rx,
        ))
    }

    /// Address this transport connects to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stop the connection task and wait for it to finish.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Transport task ended abnormally");
            }
        }
    }

    async fn run(
        config: TransportConfig,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
        connected: Arc<AtomicBool>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let address = config.address();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let attempt =
                tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address));
            let connect = tokio::select! {
                result = attempt => result,
                _ = shutdown_rx.changed() => break,
            };

            match connect {
                Ok(Ok(stream)) => {
                    info!(%address, "Connected to gateway");
                    connected.store(true, Ordering::SeqCst);
                    if event_tx.send(TransportEvent::Connected).is_err() {
                        debug!("Event receiver dropped, stopping transport");
                        break;
                    }

                    let (reader, writer) = stream.into_split();
                    let outcome = Self::serve(
                        reader,
                        writer,
                        config.read_buffer_size,
                        &mut outbound_rx,
                        &event_tx,
                        &mut shutdown_rx,
                    )
                    .await;

                    connected.store(false, Ordering::SeqCst);
                    Self::discard_pending(&mut outbound_rx);

                    match outcome {
                        Served::Shutdown => break,
                        Served::ReceiverDropped => {
                            debug!("Event receiver dropped, stopping transport");
                            break;
                        }
                        Served::Disconnected(reason) => {
                            warn!(%address, %reason, "Gateway connection lost");
                            if event_tx.send(TransportEvent::Disconnected).is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(Err(e)) => warn!(%address, error = %e, "Failed to connect to gateway"),
                Err(_) => warn!(
                    %address,
                    timeout = ?config.connect_timeout,
                    "Timed out connecting to gateway"
                ),
            }

            if !config.reconnect {
                break;
            }

            debug!(delay = ?config.reconnect_delay, "Reconnecting after delay");
            tokio::select! {
                _ = tokio::time::sleep(config.reconnect_delay) => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        connected.store(false, Ordering::SeqCst);
        info!(%address, "Transport stopped");
    }

    async fn serve(
        mut reader: OwnedReadHalf,
        mut writer: OwnedWriteHalf,
        buffer_size: usize,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        event_tx: &mpsc::UnboundedSender<TransportEvent>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Served {
        let mut buf = vec![0u8; buffer_size];
        let mut pending: Vec<u8> = Vec::new();

        loop {
            tokio::select! {
                read = reader.read(&mut buf) => match read {
                    Ok(0) => return Served::Disconnected("closed by peer".to_string()),
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        let chunk = take_text(&mut pending);
                        if chunk.is_empty() {
                            continue;
                        }
                        trace!(len = chunk.len(), "Received chunk");
                        if event_tx.send(TransportEvent::Chunk(chunk)).is_err() {
                            return Served::ReceiverDropped;
                        }
                    }
                    Err(e) => return Served::Disconnected(e.to_string()),
                },
                outbound = outbound_rx.recv() => match outbound {
                    Some(text) => {
                        trace!(%text, "Writing to gateway");
                        if let Err(e) = writer.write_all(text.as_bytes()).await {
                            return Served::Disconnected(e.to_string());
                        }
                    }
                    None => return Served::Shutdown,
                },
                _ = shutdown_rx.changed() => {
                    let _ = writer.shutdown().await;
                    return Served::Shutdown;
                }
            }
        }
    }

    /// Drop writes queued for a connection that no longer exists
    fn discard_pending(outbound_rx: &mut mpsc::UnboundedReceiver<String>) {
        let mut dropped = 0usize;
        while outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded writes queued before disconnect");
        }
    }
}

impl Transport for TcpTransport {
    fn write(&self, text: &str) -> Result<()> {
        if !self.is_connected() {
            debug!(%text, "Dropping write while disconnected");
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(text.to_string())
            .map_err(|_| TransportError::Closed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Take the longest decodable prefix of `pending` as text.
///
/// An incomplete UTF-8 sequence at the end stays in `pending`; each invalid
/// sequence before it becomes one U+FFFD.
fn take_text(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut consumed = 0;

    loop {
        match std::str::from_utf8(&pending[consumed..]) {
            Ok(valid) => {
                text.push_str(valid);
                consumed = pending.len();
                break;
            }
            Err(e) => {
                let valid_end = consumed + e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[consumed..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        consumed = valid_end + len;
                    }
                    None => {
                        consumed = valid_end;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..consumed);
    text
}
