//! Control gateway status protocol
//!
//! The gateway speaks a line-less, delimiter-based text protocol over a
//! persistent socket. Messages are separated by `*` and fields within a
//! message by `:`. The first three fields form a routing [`Topic`] and the
//! fourth is a base-10 integer status value.
//!
//! ```text
//! zone1:light:status:1*zone2:light:status:0*
//! └──────┬─────────┘ │
//!      topic       value
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use gateway_protocol::{decode_chunk, StatusValue, Topic};
//!
//! let messages = decode_chunk("zone1:light:status:1*zone2:light:status:0*");
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].topic, Topic::from("zone1:light:status"));
//! assert_eq!(messages[0].value, StatusValue::Number(1));
//! ```
//!
//! # Stream Framing
//!
//! Socket reads are not guaranteed to end on a message boundary. The
//! [`StreamDecoder`] keeps the trailing partial message of each chunk and
//! completes it with the next one:
//!
//! ```rust
//! use gateway_protocol::{ProtocolConfig, StreamDecoder};
//!
//! let mut decoder = StreamDecoder::new(ProtocolConfig::default());
//! assert!(decoder.push("zone1:light:sta").is_empty());
//! let messages = decoder.push("tus:1*");
//! assert_eq!(messages[0].topic.as_str(), "zone1:light:status");
//! ```
//!
//! # Limitations
//!
//! The protocol has no escape mechanism. A `*` or `:` inside a field value
//! cannot be represented, and [`Command::new`] refuses to build such a
//! message rather than emitting something the gateway would misparse.

pub mod command;
pub mod config;
pub mod decoder;
pub mod error;
pub mod message;

pub use command::Command;
pub use config::{Framing, ProtocolConfig};
pub use decoder::{decode_chunk, decode_message, StreamDecoder};
pub use error::{ProtocolError, Result};
pub use message::{StatusMessage, StatusValue, Topic};

/// Separator between messages on the wire
pub const MESSAGE_SEPARATOR: char = '*';

/// Separator between fields within a message
pub const FIELD_SEPARATOR: char = ':';

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::command::Command;
    pub use crate::config::{Framing, ProtocolConfig};
    pub use crate::decoder::{decode_chunk, StreamDecoder};
    pub use crate::message::{StatusMessage, StatusValue, Topic};
}
