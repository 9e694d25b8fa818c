//! In-process kNN index.
//!
//! Mirrors the observable behavior of a search cluster: the index is created
//! lazily, writes with the wrong dimension are rejected, searching or
//! deleting a missing index fails. Useful for local runs and tests.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use rag_embeddings::{Embedding, find_top_k, normalize};

use crate::VectorIndex;
use crate::document::Document;
use crate::error::{Result, VectorStoreError};

/// An entry in the in-process index.
#[derive(Debug, Clone)]
struct IndexEntry {
    /// Sequential identifier.
    id: u64,

    /// Original text.
    text: String,

    /// The embedding vector (normalized).
    embedding: Embedding,
}

/// An index held in memory.
///
/// `None` means the index has not been created (or was deleted).
pub struct MemoryIndex {
    name: String,
    dimension: usize,
    entries: RwLock<Option<Vec<IndexEntry>>>,
}

impl MemoryIndex {
    /// Create a handle for an index that does not exist yet.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            entries: RwLock::new(None),
        }
    }

    /// Number of stored documents; `None` if the index does not exist.
    pub async fn document_count(&self) -> Option<usize> {
        self.entries.read().await.as_ref().map(Vec::len)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn index_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.entries.read().await.is_some())
    }

    async fn create_index(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.is_none() {
            *entries = Some(Vec::new());
            info!("Created in-memory index {}", self.name);
        }
        Ok(())
    }

    async fn add_document(&self, document: Document) -> Result<()> {
        let mut guard = self.entries.write().await;
        let entries = guard
            .as_mut()
            .ok_or_else(|| VectorStoreError::Indexing(format!("no such index [{}]", self.name)))?;

        if document.embedding.len() != self.dimension {
            return Err(VectorStoreError::Indexing(format!(
                "Vector dimension mismatch. Expected: {}, Given: {}",
                self.dimension,
                document.embedding.len()
            )));
        }

        let mut embedding = document.embedding;
        normalize(&mut embedding);

        let id = entries.len() as u64;
        entries.push(IndexEntry {
            id,
            text: document.text,
            embedding,
        });
        debug!("Added document {id} to in-memory index {}", self.name);

        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<String>> {
        let guard = self.entries.read().await;
        let entries = guard
            .as_ref()
            .ok_or_else(|| VectorStoreError::IndexAbsent(self.name.clone()))?;

        if vector.len() != self.dimension {
            return Err(VectorStoreError::Request {
                status: 400,
                reason: format!(
                    "Query vector has invalid dimension: {}. Dimension should be: {}",
                    vector.len(),
                    self.dimension
                ),
            });
        }

        let ranked = find_top_k(vector, entries.iter().map(|e| e.embedding.as_slice()), k)
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;

        let texts = ranked
            .into_iter()
            .filter_map(|r| entries.get(r.position))
            .map(|e| {
                debug!("Matched document {}", e.id);
                e.text.clone()
            })
            .collect();

        Ok(texts)
    }

    async fn delete_index(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.take().is_none() {
            return Err(VectorStoreError::Deletion(format!(
                "no such index [{}]",
                self.name
            )));
        }
        info!("Deleted in-memory index {}", self.name);
        Ok(())
    }
}
