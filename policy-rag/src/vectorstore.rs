//! Vector index trait consumed by the gateway.

use async_trait::async_trait;

use crate::document::{IndexedChunk, SearchResult};
use crate::error::Result;

/// A vector index holding named collections of embedded policy chunks.
///
/// The question-answering path only reads from the index; writes happen when
/// a corpus is loaded. Implementations must tolerate concurrent readers.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert or replace chunks by id. Chunks must carry embeddings.
    async fn upsert(&self, collection: &str, chunks: &[IndexedChunk]) -> Result<()>;

    /// Return the `top_k` chunks closest to `embedding`, best first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
