//! Transport to the control gateway
//!
//! The bridge core only needs two things from a transport: a stream of raw
//! text chunks, framed by connection changes, and a way to write text back.
//! This crate defines that boundary as the [`Transport`] trait plus
//! [`TransportEvent`], and ships a TCP implementation.
//!
//! # Overview
//!
//! - [`Transport`]: the outbound half of the boundary (`write`)
//! - [`TcpTransport`]: tokio-based client that owns the socket, forwards
//!   [`TransportEvent`]s on a channel and reconnects after a fixed delay
//! - [`TransportConfig`]: address, reconnect and buffer settings
//!
//! Chunks are delivered exactly as read from the socket. They are not
//! aligned to protocol messages; framing is the decoder's job. A partial
//! message never continues across a `Disconnected`/`Connected` pair.
//!
//! # Example
//!
//! ```no_run
//! use gateway_transport::{TcpTransport, Transport, TransportConfig, TransportEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_transport::TransportError> {
//!     let config = TransportConfig::new("192.168.1.50", 8000);
//!     let (transport, mut events) = TcpTransport::spawn(config)?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             TransportEvent::Connected => transport.write("zone1:light:set:1*")?,
//!             TransportEvent::Chunk(chunk) => println!("received: {}", chunk),
//!             TransportEvent::Disconnected => println!("connection lost"),
//!         }
//!     }
//!
//!     transport.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Delivery Guarantees
//!
//! None beyond TCP's. Chunks sent by the gateway while the connection is
//! down are lost, and writes attempted while disconnected are rejected with
//! [`TransportError::NotConnected`] rather than queued for later.

pub mod config;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod recording;
mod tcp;

pub use config::TransportConfig;
pub use error::{Result, TransportError};
#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingTransport;
pub use tcp::TcpTransport;

use std::sync::Arc;

/// Inbound side of the transport boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A new connection was established
    Connected,
    /// Text read from the current connection
    Chunk(String),
    /// The current connection was lost; a reconnect may follow
    Disconnected,
}

/// Outbound half of the transport boundary
pub trait Transport: Send + Sync {
    /// Send text to the gateway as-is
    fn write(&self, text: &str) -> Result<()>;

    /// Whether the transport currently has a live connection
    fn is_connected(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn write(&self, text: &str) -> Result<()> {
        (**self).write(text)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
