//! Outbound command encoding
//!
//! Commands use the same framing as status messages: fields joined with
//! `:` and terminated with `*`. Because the protocol cannot escape its
//! delimiters, fields containing `:` or `*` are rejected.

use std::fmt;

use crate::error::{ProtocolError, Result};
use crate::message::Topic;
use crate::{FIELD_SEPARATOR, MESSAGE_SEPARATOR};

/// A validated outbound command
///
/// # Example
///
/// ```rust
/// use gateway_protocol::{Command, Topic};
///
/// let command = Command::new(["blind7", "WindowCovering", "SetTargetPosition", "40"])?;
/// assert_eq!(command.encode(), "blind7:WindowCovering:SetTargetPosition:40*");
///
/// let command = Command::with_value(&Topic::from("zone1:light:set"), 1)?;
/// assert_eq!(command.to_string(), "zone1:light:set:1*");
/// # Ok::<(), gateway_protocol::ProtocolError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    fields: Vec<String>,
}

impl Command {
    /// Build a command from its fields
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();

        if fields.first().map_or(true, |f| f.trim().is_empty()) {
            return Err(ProtocolError::BlankLeadingField);
        }

        for (index, field) in fields.iter().enumerate() {
            if let Some(delimiter) = field
                .chars()
                .find(|c| *c == FIELD_SEPARATOR || *c == MESSAGE_SEPARATOR)
            {
                return Err(ProtocolError::ReservedDelimiter {
                    index,
                    field: field.clone(),
                    delimiter,
                });
            }
        }

        Ok(Self { fields })
    }

    /// Build a `topic:value` command, the shape status messages use
    pub fn with_value(topic: &Topic, value: i64) -> Result<Self> {
        let [first, second, third] = topic.parts();
        let value = value.to_string();
        Self::new([first, second, third, value.as_str()])
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Encode to wire text, including the trailing separator
    pub fn encode(&self) -> String {
        let mut encoded = self.fields.join(&FIELD_SEPARATOR.to_string());
        encoded.push(MESSAGE_SEPARATOR);
        encoded
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
