//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Model files could not be found or loaded.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// Tokenizer could not be loaded.
    #[error("tokenizer load failed: {0}")]
    TokenizerLoad(String),

    /// Text could not be tokenized.
    #[error("failed to encode text: {0}")]
    Tokenize(String),

    /// Running the model failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The model output did not have the expected shape.
    #[error("unexpected output shape: {0}")]
    Shape(String),

    /// Input text was empty.
    #[error("cannot embed empty text")]
    EmptyInput,

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
