//! Error types for the gateway-platform crate.

use thiserror::Error;

/// Errors raised by a [`HostPlatform`](crate::HostPlatform) implementation.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host refused an accessory operation
    #[error("Host rejected {operation} of accessory {identity}: {reason}")]
    Rejected {
        operation: &'static str,
        identity: String,
        reason: String,
    },

    /// Reading or writing the accessory cache failed
    #[error("Accessory cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The accessory cache could not be encoded or decoded
    #[error("Accessory cache format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors that can occur in the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// A host operation failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// A device group or entry in the configuration is malformed
    #[error("Invalid device configuration for '{device_type}': {reason}")]
    InvalidDevice { device_type: String, reason: String },

    /// Invalid platform configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience type alias for Results using PlatformError.
pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let error = HostError::Rejected {
            operation: "registration",
            identity: "abc".to_string(),
            reason: "full".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Host rejected registration of accessory abc: full"
        );
    }

    #[test]
    fn test_platform_error_from_host_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: PlatformError = HostError::from(io).into();
        assert!(matches!(error, PlatformError::Host(HostError::Io(_))));
        assert_eq!(
            error.to_string(),
            "Host error: Accessory cache I/O error: denied"
        );
    }

    #[test]
    fn test_invalid_device_display() {
        let error = PlatformError::InvalidDevice {
            device_type: "WindowCovering".to_string(),
            reason: "entry 0: missing field `id`".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid device configuration for 'WindowCovering': entry 0: missing field `id`"
        );
    }
}
