//! Inference error types

use thiserror::Error;

/// Inference error type
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Connection refused, DNS failure, reset before a response
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// No response within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Endpoint answered with a non-success status
    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body is not a chat-completions payload
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Payload parsed but carried no generated text
    #[error("Endpoint returned no content")]
    EmptyResponse,

    /// Any other transport failure
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl InferenceError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::Serialization(_))
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Unreachable(e.to_string())
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Http(e)
        }
    }
}

/// Result type for inference operations
pub type InferenceResult<T> = Result<T, InferenceError>;
