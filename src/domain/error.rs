//! Domain-level error types for clickup-chat-backup.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use thiserror::Error;

/// Application-level errors covering the failure taxonomy of a backup run.
///
/// `Auth` is the one fatal mid-run variant: an invalid token cannot be
/// salvaged, so it aborts the whole export. Transient transport and
/// rate-limit conditions never surface here; the HTTP client degrades them
/// to "no data" after its retry budget.
#[derive(Error, Debug)]
pub enum AppError {
    /// The API rejected the token.
    #[error("Authorization failed: {message}")]
    Auth { message: String },

    /// HTTP client could not be constructed.
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// JSON serialization failed.
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// CSV serialization failed.
    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a fatal authorization error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP error with context.
    pub fn http(message: impl Into<String>, err: reqwest::Error) -> Self {
        Self::Http {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a JSON error from a serde error.
    pub fn json(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a CSV error from a csv error.
    pub fn csv(err: csv::Error) -> Self {
        Self::Csv {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
