//! Common error types for the completion gateway

use thiserror::Error;

/// Construction-time error type.
///
/// Backend and parse failures never surface through this type once a
/// [`crate::Gateway`] exists; only bad configuration is fatal.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing API credential: set backend.api_key or the {0} environment variable")]
    MissingCredential(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single exchange with the generative backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Quota exhaustion or rate limiting; expected to clear with backoff
    #[error("Backend rate limited ({status}): {message}")]
    Transient { status: u16, message: String },

    /// Any other non-success answer, including an undecodable envelope
    #[error("Backend returned {status}: {message}")]
    Request { status: u16, message: String },

    /// Connection-level failure
    #[error("Transport failure: {message}")]
    Transport { message: String, timed_out: bool },
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transient { .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Structured recovery failure. Always handled locally with a fallback.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Empty model output")]
    Empty,

    #[error("No JSON object or array found in model output")]
    NoJson,

    #[error("Invalid JSON: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
