//! Unified error type for the bootstrap coordinator
//!
//! One enum covers every failure the coordinator can report. Bootstrap key
//! failures are `Fatal`: callers that serve RPCs must terminate the process
//! rather than hand out a degraded identity.

use serde::{Deserialize, Serialize};

/// Unified error type for all Rollcall operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RollcallError {
    /// Invalid input, or a protocol step taken out of order
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Cryptographic operation failed
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Bootstrap ceremony is corrupted and the process must restart
    #[error("Fatal: {message}")]
    Fatal {
        /// Error message describing the unrecoverable failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl RollcallError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fatal bootstrap error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Escalate any error into a fatal one, keeping its description.
    pub fn into_fatal(self) -> Self {
        match self {
            Self::Fatal { .. } => self,
            other => Self::fatal(other.to_string()),
        }
    }

    /// Whether the process must terminate after reporting this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Short machine-readable name of the variant, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "invalid",
            Self::NotFound { .. } => "not_found",
            Self::Crypto { .. } => "crypto",
            Self::Serialization { .. } => "serialization",
            Self::Network { .. } => "network",
            Self::Config { .. } => "config",
            Self::Fatal { .. } => "fatal",
            Self::Internal { .. } => "internal",
        }
    }

    /// Description without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Invalid { message }
            | Self::NotFound { message }
            | Self::Crypto { message }
            | Self::Serialization { message }
            | Self::Network { message }
            | Self::Config { message }
            | Self::Fatal { message }
            | Self::Internal { message } => message,
        }
    }

    /// Rebuild an error from its wire kind and message.
    pub fn from_kind(kind: &str, message: impl Into<String>) -> Self {
        match kind {
            "invalid" => Self::invalid(message),
            "not_found" => Self::not_found(message),
            "crypto" => Self::crypto(message),
            "serialization" => Self::serialization(message),
            "network" => Self::network(message),
            "config" => Self::config(message),
            "fatal" => Self::fatal(message),
            _ => Self::internal(message),
        }
    }
}

/// Standard Result type for Rollcall operations
pub type Result<T> = std::result::Result<T, RollcallError>;

impl From<std::io::Error> for RollcallError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for RollcallError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RollcallError::not_found("worker 7");
        assert!(matches!(err, RollcallError::NotFound { .. }));
        assert_eq!(err.to_string(), "Not found: worker 7");
    }

    #[test]
    fn test_into_fatal_keeps_description() {
        let err = RollcallError::crypto("share failed validation").into_fatal();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Fatal: Crypto error: share failed validation"
        );
    }

    #[test]
    fn test_kind_round_trip() {
        let err = RollcallError::invalid("barrier already released");
        let rebuilt = RollcallError::from_kind(err.kind(), "barrier already released");
        assert_eq!(err, rebuilt);
        assert!(matches!(
            RollcallError::from_kind("bogus", "x"),
            RollcallError::Internal { .. }
        ));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(
            RollcallError::from(io_err),
            RollcallError::NotFound { .. }
        ));
    }
}
