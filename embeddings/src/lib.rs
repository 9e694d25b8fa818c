//! # Embeddings
//!
//! This crate turns text into dense vectors for the RAG request handler.
//!
//! ## Features
//!
//! - **Sentence Embeddings**: Run a sentence-transformer ONNX export locally
//! - **Similarity Helpers**: Cosine ranking used by in-process indexes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  text ──► EmbedTokenizer ──► ONNX graph ──► mean pool ──► L2    │
//! │                                                     │           │
//! │                                                     ▼           │
//! │                                            Embedding (384)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod sentence;
pub mod similarity;
pub mod tokenize;

pub use error::{EmbeddingError, Result};
pub use provider::Embedder;
pub use sentence::{SentenceEmbedder, SentenceEmbedderConfig};
pub use similarity::{SimilarityResult, cosine_similarity, find_top_k, normalize};
pub use tokenize::{EmbedTokenizer, TokenizedInput};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension produced by MiniLM-class sentence-transformers.
pub const EMBEDDING_DIMENSION: usize = 384;
