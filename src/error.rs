use std::io;

use axum::http::StatusCode;

/// Reasons an inbound event is rejected before any downstream call.
///
/// These are soft failures: they only ever show up in the response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid API version [{value}]. Supported API Versions: [v1]")]
    InvalidApiVersion { value: String },

    #[error("Invalid content type [{value}]. Content-Type should be 'application/json'")]
    InvalidContentType { value: String },

    #[error("Empty request body")]
    EmptyBody,

    #[error("Failed to parse request body: {0}")]
    MalformedBody(String),

    #[error("Invalid {field} []. {field} must be a non-empty string")]
    EmptyField { field: &'static str },
}

/// Custom error type for git_status_relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to get secret '{name}': {reason}")]
    Secret { name: String, reason: String },

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to post status: {status}")]
    Remote { status: StatusCode, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl RelayError {
    pub fn secret(name: &str, reason: impl ToString) -> Self {
        Self::Secret {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Soft failures are reported in the response only and never surface
    /// as a function-level error.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
