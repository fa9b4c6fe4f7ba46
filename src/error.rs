//! Error types for the vigil scan-orchestration core.
//!
//! This module provides structured error handling using thiserror. Parsers
//! deliberately have no error variant of their own: they degrade to defaults
//! and log, because scanner output is not contractually guaranteed.

use thiserror::Error;

/// Main error type for vigil operations.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Digest is too short or not hexadecimal for content addressing
    #[error("Invalid digest format: {0}")]
    InvalidDigestFormat(String),

    /// Invalid input data (missing file, malformed field)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The scanner executable could not be started or crashed before output
    #[error("External process failure: {0}")]
    ExternalProcessFailure(String),

    /// Reputation API unreachable, rate-limited, or unauthorized
    #[error("External service failure: {0}")]
    ExternalServiceFailure(String),

    /// Reputation report missing its expected nested structure
    #[error("Malformed reputation report: {0}")]
    MalformedReport(String),

    /// Persistence layer failure; nothing was recorded
    #[error("History store unavailable: {0}")]
    StoreUnavailable(String),

    /// External leg exceeded its time budget
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        VigilError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VigilError::InvalidDigestFormat("abc".to_string());
        assert_eq!(err.to_string(), "Invalid digest format: abc");

        let err = VigilError::Timeout { seconds: 120 };
        assert_eq!(err.to_string(), "Operation timed out after 120s");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VigilError = io.into();
        assert!(matches!(err, VigilError::Io(_)));
    }
}
