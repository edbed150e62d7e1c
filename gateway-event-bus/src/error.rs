//! Handler error types

/// Error returned by (or synthesized for) a failing event handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler reported a failure
    #[error("Handler failed: {0}")]
    Failed(String),

    /// The handler panicked during dispatch
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The handler propagated another error
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Create a `Failed` error from any message
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Return type of event handlers
pub type HandlerResult = std::result::Result<(), HandlerError>;
