//! The embedder seam used by the request router.

use async_trait::async_trait;

use crate::Embedding;
use crate::error::Result;

/// Trait for anything that turns text into a fixed-length vector.
///
/// Implementations must be deterministic for a fixed model: encoding the
/// same text twice yields the same vector. The request router relies on this
/// so that a freshly ingested document is found again by an identical query.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Get the name of this embedder (usually the model directory).
    fn name(&self) -> &str;

    /// Length of every vector returned by [`Embedder::encode`].
    fn dimension(&self) -> usize;

    /// Encode a single text.
    async fn encode(&self, text: &str) -> Result<Embedding>;
}
