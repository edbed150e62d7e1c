//! Error types for the gateway-protocol crate.

/// Errors raised while building protocol messages.
///
/// Decoding never fails: malformed input is either dropped or carried as
/// [`StatusValue::NaN`](crate::StatusValue::NaN). Only the encoding side can
/// reject input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A command field contains a wire delimiter, which cannot be escaped
    #[error("Field {index} contains reserved delimiter {delimiter:?}: {field:?}")]
    ReservedDelimiter {
        /// Position of the offending field (0-based)
        index: usize,
        /// The field as supplied
        field: String,
        /// The delimiter found in the field
        delimiter: char,
    },

    /// The leading field of a command is blank, so the gateway would drop it
    #[error("Leading command field must not be blank")]
    BlankLeadingField,
}

/// Convenience type alias for Results using ProtocolError.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let error = ProtocolError::ReservedDelimiter {
            index: 2,
            field: "a*b".to_string(),
            delimiter: '*',
        };
        assert_eq!(
            error.to_string(),
            "Field 2 contains reserved delimiter '*': \"a*b\""
        );

        let error = ProtocolError::BlankLeadingField;
        assert_eq!(error.to_string(), "Leading command field must not be blank");
    }
}
