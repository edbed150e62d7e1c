//! Status message decoder
//!
//! Turns raw socket text into [`StatusMessage`]s. Decoding is total: every
//! input produces a (possibly empty) list of messages and nothing panics.
//!
//! A candidate whose first field is blank is dropped without error. That is
//! a filtering rule of the protocol (keep-alives and the empty tail after the
//! final `*` look like this), not a failure.

use tracing::{trace, warn};

use crate::config::{Framing, ProtocolConfig};
use crate::message::{StatusMessage, StatusValue, Topic};
use crate::{FIELD_SEPARATOR, MESSAGE_SEPARATOR};

/// Decode a single message candidate (text between two `*`)
///
/// Returns `None` when the first field is empty after trimming whitespace.
/// Missing second or third fields contribute empty strings to the topic, and
/// a missing or non-numeric fourth field yields [`StatusValue::NaN`]. Fields
/// after the fourth are ignored.
pub fn decode_message(candidate: &str) -> Option<StatusMessage> {
    let mut fields = candidate.split(FIELD_SEPARATOR);

    let first = fields.next().unwrap_or_default();
    if first.trim().is_empty() {
        trace!(candidate, "Dropping message with blank leading field");
        return None;
    }

    let second = fields.next().unwrap_or_default();
    let third = fields.next().unwrap_or_default();
    let value = StatusValue::parse(fields.next());

    Some(StatusMessage {
        topic: Topic::from_parts(first, second, third),
        value,
    })
}

/// Decode every message in a chunk, in order of appearance
///
/// The chunk is assumed to hold whole messages; an unterminated trailing
/// message is decoded as-is. Use [`StreamDecoder`] when reads may split a
/// message.
pub fn decode_chunk(chunk: &str) -> Vec<StatusMessage> {
    chunk
        .split(MESSAGE_SEPARATOR)
        .filter_map(decode_message)
        .collect()
}

/// Incremental decoder for a socket stream
///
/// In [`Framing::Buffered`] mode only `*`-terminated messages are emitted;
/// the text after the last separator is held back and prefixed to the next
/// chunk. If that residual grows past
/// [`ProtocolConfig::max_residual_len`] it is discarded, so a peer that never
/// sends a separator cannot grow the buffer without bound. The rest of that
/// message is skipped up to and including its terminating `*`.
///
/// # Example
///
/// ```rust
/// use gateway_protocol::{ProtocolConfig, StatusValue, StreamDecoder};
///
/// let mut decoder = StreamDecoder::new(ProtocolConfig::default());
///
/// let first = decoder.push("a:b:c:1*a:b:");
/// assert_eq!(first.len(), 1);
///
/// let second = decoder.push("c:2*");
/// assert_eq!(second[0].value, StatusValue::Number(2));
/// ```
#[derive(Debug)]
pub struct StreamDecoder {
    config: ProtocolConfig,
    residual: String,
    /// Skipping the tail of an oversized message
    discarding: bool,
    dropped_partials: u64,
}

impl StreamDecoder {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            residual: String::new(),
            discarding: false,
            dropped_partials: 0,
        }
    }

    /// Feed a chunk and collect the messages it completes
    pub fn push(&mut self, chunk: &str) -> Vec<StatusMessage> {
        match self.config.framing {
            Framing::PerChunk => decode_chunk(chunk),
            Framing::Buffered => self.push_buffered(chunk),
        }
    }

    fn push_buffered(&mut self, chunk: &str) -> Vec<StatusMessage> {
        let chunk = if self.discarding {
            match chunk.find(MESSAGE_SEPARATOR) {
                Some(end) => {
                    self.discarding = false;
                    &chunk[end + MESSAGE_SEPARATOR.len_utf8()..]
                }
                None => return Vec::new(),
            }
        } else {
            chunk
        };

        self.residual.push_str(chunk);

        let messages = match self.residual.rfind(MESSAGE_SEPARATOR) {
            Some(last) => {
                let complete: String = self.residual.drain(..=last).collect();
                decode_chunk(&complete)
            }
            None => Vec::new(),
        };

        if self.residual.len() > self.config.max_residual_len {
            warn!(
                residual_len = self.residual.len(),
                max = self.config.max_residual_len,
                "Discarding unterminated message that exceeds the residual limit"
            );
            self.residual.clear();
            self.discarding = true;
            self.dropped_partials += 1;
        }

        messages
    }

    /// Decode whatever is held in the residual buffer and clear it
    ///
    /// Call this when the stream ends (or when the peer is known to omit the
    /// final separator) so the last message is not lost.
    pub fn flush(&mut self) -> Vec<StatusMessage> {
        self.discarding = false;
        let residual = std::mem::take(&mut self.residual);
        decode_chunk(&residual)
    }

    /// Drop any partial message, e.g. after a reconnect
    pub fn reset(&mut self) {
        self.residual.clear();
        self.discarding = false;
    }

    /// Text currently held back waiting for a separator
    pub fn residual(&self) -> &str {
        &self.residual
    }

    /// Number of partial messages discarded for exceeding the residual limit
    pub fn dropped_partials(&self) -> u64 {
        self.dropped_partials
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(ProtocolConfig::default())
    }
}
