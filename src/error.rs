//! Error types for the formkeep backup tracker
//!
//! This module provides structured error definitions using thiserror. Callers
//! at the binary edge propagate with anyhow, which converts into
//! [`FormKeepError::Other`].

use crate::types::EntryStatus;
use thiserror::Error;

/// Main error type for formkeep operations
#[derive(Error, Debug)]
pub enum FormKeepError {
    /// Local key-value storage rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Write would exceed the storage quota
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} available")]
    QuotaExceeded { needed: usize, quota: usize },

    /// No entry is tracked for the given form
    #[error("Form not tracked: {0}")]
    FormNotTracked(String),

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Status may only move forward out of `active`
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: EntryStatus, to: EntryStatus },

    /// Export format not recognized
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for formkeep operations
pub type Result<T> = std::result::Result<T, FormKeepError>;

/// Convert anyhow::Error to FormKeepError
impl From<anyhow::Error> for FormKeepError {
    fn from(err: anyhow::Error) -> Self {
        FormKeepError::Other(err.to_string())
    }
}

impl From<config::ConfigError> for FormKeepError {
    fn from(err: config::ConfigError) -> Self {
        FormKeepError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for FormKeepError {
    fn from(err: toml::de::Error) -> Self {
        FormKeepError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormKeepError::FormNotTracked("contact-form".to_string());
        assert_eq!(err.to_string(), "Form not tracked: contact-form");

        let err = FormKeepError::InvalidTransition {
            from: EntryStatus::Submitted,
            to: EntryStatus::Active,
        };
        assert_eq!(err.to_string(), "Invalid status transition: submitted -> active");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let err: FormKeepError = json_err.unwrap_err().into();
        assert!(matches!(err, FormKeepError::Serialization(_)));

        let err: FormKeepError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, FormKeepError::Other(ref msg) if msg == "boom"));
    }
}
