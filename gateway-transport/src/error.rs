//! Error types for the gateway-transport crate.

/// Errors that can occur in the transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No connection to the gateway is currently established
    #[error("Not connected to gateway")]
    NotConnected,

    /// The transport task has stopped
    #[error("Transport is closed")]
    Closed,

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Socket I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using TransportError.
pub type Result<T> = std::result::Result<T, TransportError>;
