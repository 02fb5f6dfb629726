//! Error types for reasoning collaborator calls.

use thiserror::Error;

/// Result type alias for reasoning operations.
pub type Result<T> = std::result::Result<T, ReasoningError>;

/// Errors that can occur while talking to a reasoning collaborator.
#[derive(Error, Debug)]
pub enum ReasoningError {
    /// Provider not configured.
    #[error("reasoning provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The response could not be coerced into the requested schema.
    #[error("response does not match schema `{schema}`: {reason}")]
    SchemaViolation { schema: String, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for ReasoningError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReasoningError::Timeout
        } else {
            ReasoningError::Http(err)
        }
    }
}
