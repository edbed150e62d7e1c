//! Decoded protocol units: topics, status values and messages

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::FIELD_SEPARATOR;

/// Routing key of a status message
///
/// Formed by joining the first three fields of a message with `:`. Routing
/// is by exact string equality, so `"zone1:light:status"` and
/// `" zone1:light:status"` are different topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from an already joined key
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// Joins three fields into a topic
    pub fn from_parts(first: &str, second: &str, third: &str) -> Self {
        let mut topic = String::with_capacity(first.len() + second.len() + third.len() + 2);
        topic.push_str(first);
        topic.push(FIELD_SEPARATOR);
        topic.push_str(second);
        topic.push(FIELD_SEPARATOR);
        topic.push_str(third);
        Self(topic)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the topic back into its three fields
    ///
    /// Topics built with [`Topic::new`] from an arbitrary string may have
    /// fewer separators; missing fields come back empty.
    pub fn parts(&self) -> [&str; 3] {
        let mut parts = self.0.splitn(3, FIELD_SEPARATOR);
        [
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
        ]
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Topic::new(s)
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Topic::new(s)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Status value carried by a message
///
/// The gateway sends base-10 integers. A missing or non-numeric field is not
/// an error: it decodes to [`StatusValue::NaN`] and is delivered to
/// subscribers like any other value, so handlers must tolerate it.
///
/// Unlike IEEE NaN, `StatusValue::NaN == StatusValue::NaN` holds, which keeps
/// decoded sequences comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusValue {
    /// A parsed integer
    Number(i64),
    /// The field was missing or had no leading digits
    NaN,
}

impl StatusValue {
    /// Parses a status field using leading-integer semantics
    ///
    /// Leading whitespace is skipped, one optional sign is accepted, and
    /// digits are consumed up to the first non-digit. Trailing garbage is
    /// ignored (`"42%"` is 42). Out-of-range values saturate.
    pub fn parse(field: Option<&str>) -> Self {
        let Some(field) = field else {
            return StatusValue::NaN;
        };

        let trimmed = field.trim_start();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let digit_count = digits.bytes().take_while(u8::is_ascii_digit).count();
        if digit_count == 0 {
            return StatusValue::NaN;
        }

        let value = digits.as_bytes()[..digit_count]
            .iter()
            .fold(0i64, |acc, byte| {
                let digit = i64::from(byte - b'0');
                if negative {
                    acc.saturating_mul(10).saturating_sub(digit)
                } else {
                    acc.saturating_mul(10).saturating_add(digit)
                }
            });

        StatusValue::Number(value)
    }

    /// Returns the integer, or `None` for NaN
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatusValue::Number(n) => Some(*n),
            StatusValue::NaN => None,
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, StatusValue::NaN)
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusValue::Number(n) => write!(f, "{}", n),
            StatusValue::NaN => write!(f, "NaN"),
        }
    }
}

impl From<i64> for StatusValue {
    fn from(n: i64) -> Self {
        StatusValue::Number(n)
    }
}

/// A decoded status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Routing key built from the first three fields
    pub topic: Topic,
    /// Value parsed from the fourth field
    pub value: StatusValue,
}

impl StatusMessage {
    pub fn new(topic: impl Into<Topic>, value: impl Into<StatusValue>) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
        }
    }
}
