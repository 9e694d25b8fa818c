//! Error types for the generation client.

use thiserror::Error;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors that can occur while invoking the model endpoint.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// Invalid response from the endpoint.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Endpoint configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (including timeouts).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
