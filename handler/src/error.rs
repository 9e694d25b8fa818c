//! Error types for the request handler.

use thiserror::Error;

/// Result type alias for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Errors raised while running an operation.
///
/// None of these reach the caller directly: the router turns each one into
/// an envelope and logs the detail.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A required request field was absent.
    #[error("missing request field: {0}")]
    MissingField(&'static str),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] rag_embeddings::EmbeddingError),

    /// Vector store error.
    #[error("vector store error: {0}")]
    VectorStore(#[from] rag_vector_store::VectorStoreError),

    /// Generation error.
    #[error("generation error: {0}")]
    Generation(#[from] rag_generation::GenerationError),

    /// Request body was not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while reading configuration at startup. These are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    /// A variable is set to something unusable.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
