//! Error types for Plumbline

use thiserror::Error;

use crate::types::{ApiError, ApiErrorKind};

/// Result type alias using Plumbline Error
pub type Result<T> = std::result::Result<T, Error>;

/// Plumbline error types
#[derive(Error, Debug)]
pub enum Error {
    /// A request failed before a response was received.
    #[error("Transport error: {0}")]
    Transport(ApiError),

    /// A response was received with a non-2xx status.
    #[error("HTTP {} {}", .0.status.unwrap_or_default(), .0.status_text.as_deref().unwrap_or_default())]
    HttpStatus(ApiError),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Step '{step}' timed out after {timeout_ms}ms")]
    ScenarioTimeout { step: String, timeout_ms: u64 },

    #[error("Timer {0} was not started")]
    TimerNotStarted(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// The client failure carried by this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Transport(e) | Error::HttpStatus(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure should abort the whole run rather than one scenario.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        match e.kind {
            ApiErrorKind::HttpStatus => Error::HttpStatus(e),
            ApiErrorKind::Transport | ApiErrorKind::Timeout => Error::Transport(e),
        }
    }
}
