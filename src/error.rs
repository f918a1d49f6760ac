// src/error.rs

//! Unified error handling for the synchronization layer.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (connect, DNS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server answered with a status the caller cannot use
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Conditional fetch found nothing new
    #[error("Not modified")]
    NotModified,

    /// Requested byte range is no longer valid
    #[error("Range not satisfiable")]
    RangeNotSatisfiable,

    /// Malformed line or JSON shape
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Live stream identifier could not be found
    #[error("Resolution failed: {0}")]
    Resolution(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a live stream resolution error.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    /// Outcomes that mean "nothing new" rather than a failure.
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NotModified | Self::RangeNotSatisfiable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_op_classification() {
        assert!(AppError::NotModified.is_no_op());
        assert!(AppError::RangeNotSatisfiable.is_no_op());
        assert!(!AppError::parse("line", "too few fields").is_no_op());
        assert!(
            !AppError::Status {
                url: "https://example.com".into(),
                status: 500
            }
            .is_no_op()
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::parse("offset line", "missing number");
        assert_eq!(err.to_string(), "Parse error in offset line: missing number");
    }
}
