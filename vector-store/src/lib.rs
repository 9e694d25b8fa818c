//! # Vector Store
//!
//! kNN index access for the RAG request handler.
//!
//! The [`VectorIndex`] trait is the seam the request router talks to. Two
//! implementations are provided:
//!
//! - [`OpenSearchClient`]: an OpenSearch-compatible REST cluster
//! - [`MemoryIndex`]: an in-process index with the same observable behavior
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rag_vector_store::{Document, OpenSearchClient, OpenSearchConfig, VectorIndex};
//!
//! let index = OpenSearchClient::new(OpenSearchConfig::new("https://search.local:443"))?;
//! index.insert(Document::new("cats are mammals", embedding)).await?;
//! let texts = index.search(&query_vector, 2).await?;
//! ```

pub mod document;
pub mod error;
pub mod memory;
pub mod opensearch;

use async_trait::async_trait;

pub use document::{Document, IndexSchema, SearchRequest};
pub use error::{Result, VectorStoreError};
pub use memory::MemoryIndex;
pub use opensearch::{OpenSearchClient, OpenSearchConfig};

/// Default index name.
pub const DEFAULT_INDEX_NAME: &str = "sample-embeddings-store-dev";

/// A named kNN index of text documents.
///
/// `insert` and `ensure_index` are provided in terms of the lower level
/// operations so every backend creates its index lazily the same way.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the index.
    fn index_name(&self) -> &str;

    /// Declared vector dimension.
    fn dimension(&self) -> usize;

    /// Whether the index currently exists.
    async fn exists(&self) -> Result<bool>;

    /// Create the index. Creating an index that already exists succeeds.
    async fn create_index(&self) -> Result<()>;

    /// Add one document to an existing index.
    async fn add_document(&self, document: Document) -> Result<()>;

    /// Texts of the `k` documents nearest to `vector`, best first.
    ///
    /// Fails with [`VectorStoreError::IndexAbsent`] when the index does not
    /// exist.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<String>>;

    /// Remove the index and every document in it.
    ///
    /// Fails with [`VectorStoreError::Deletion`] when the store rejects the
    /// request, including when the index is absent.
    async fn delete_index(&self) -> Result<()>;

    /// Create the index unless it already exists.
    async fn ensure_index(&self) -> Result<()> {
        if !self.exists().await? {
            self.create_index().await?;
        }
        Ok(())
    }

    /// Ensure the index exists, then add `document` to it.
    async fn insert(&self, document: Document) -> Result<()> {
        self.ensure_index().await?;
        self.add_document(document).await
    }
}
