//! Error types for the vector store.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Errors that can occur while talking to a vector index.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// The store rejected a document write.
    #[error("indexing rejected: {0}")]
    Indexing(String),

    /// The store rejected an index deletion.
    #[error("deletion rejected: {0}")]
    Deletion(String),

    /// The index being searched does not exist.
    #[error("index does not exist: {0}")]
    IndexAbsent(String),

    /// The store answered with an unexpected status.
    #[error("request failed with status {status}: {reason}")]
    Request { status: u16, reason: String },

    /// The store answered with a body we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
