//! Error types for the text-generation collaborator.

use thiserror::Error;

/// Failure of a single text-generation request.
///
/// The shell collapses every variant into one fixed transcript line; the
/// variants exist for logging.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Transport failure (connect, timeout, body read).
    #[error("Network request failed: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    /// The provider answered but the body had no usable text.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The driver could not be constructed or is missing settings.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result alias for text-generation calls.
pub type GenerateResult<T> = Result<T, GenerateError>;

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            GenerateError::Service {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            GenerateError::MalformedResponse(err.to_string())
        } else {
            GenerateError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GenerateError {
    fn from(err: serde_json::Error) -> Self {
        GenerateError::MalformedResponse(err.to_string())
    }
}
