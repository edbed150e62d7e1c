//! Configuration types for protocol decoding
//!
//! Controls how [`StreamDecoder`](crate::StreamDecoder) frames incoming
//! socket chunks into messages.

use serde::{Deserialize, Serialize};

/// How incoming chunks are framed into messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Keep the trailing partial message of each chunk and complete it with
    /// the next chunk. Only `*`-terminated messages are emitted.
    #[default]
    Buffered,

    /// Decode every chunk on its own, including an unterminated trailing
    /// message. A message split across two reads is misparsed.
    PerChunk,
}

/// Configuration for the protocol decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Framing strategy
    /// Default: Buffered
    pub framing: Framing,

    /// Maximum bytes held for an unterminated message before it is dropped
    /// Default: 4096
    pub max_residual_len: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            framing: Framing::Buffered,
            max_residual_len: 4096,
        }
    }
}

impl ProtocolConfig {
    /// Create a new ProtocolConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode each chunk independently, without carrying partial messages
    pub fn per_chunk() -> Self {
        Self {
            framing: Framing::PerChunk,
            ..Default::default()
        }
    }

    /// Validate the configuration and return a description of the problem
    pub fn validate(&self) -> Result<(), String> {
        if self.framing == Framing::Buffered && self.max_residual_len == 0 {
            return Err(
                "Max residual length must be greater than 0 for buffered framing".to_string(),
            );
        }
        Ok(())
    }
}
