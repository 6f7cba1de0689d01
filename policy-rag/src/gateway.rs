//! Similarity search gateway: the retriever's only view of the vector index.
//!
//! [`SimilaritySearch`] is the narrow contract the retriever consumes.
//! [`VectorIndexGateway`] implements it by composing an [`EmbeddingProvider`]
//! with a [`VectorStore`], converting raw cosine scores into similarities and
//! enforcing the threshold at the boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::document::{Chunk, IndexedChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Collection that holds the policy corpus unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "credit_policies";

/// A service that returns candidate chunks for a query.
///
/// Implementations return at most `k` chunks, similarity-descending. When a
/// threshold is given, every returned chunk has `similarity >= threshold`.
/// An empty result means no sufficiently similar content and is not an error.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Search for the `k` most similar chunks to `query`.
    async fn search(&self, query: &str, k: usize, threshold: Option<f32>) -> Result<Vec<Chunk>>;
}

/// Gateway over an embedding model and a vector index.
pub struct VectorIndexGateway {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl VectorIndexGateway {
    /// Create a gateway over the [`DEFAULT_COLLECTION`].
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, collection: DEFAULT_COLLECTION.to_string() }
    }

    /// Use a different collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// The collection this gateway searches.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and store pre-chunked policy text.
    ///
    /// Creates the collection if needed. Chunks are stored as given; no
    /// splitting or parsing happens here.
    ///
    /// # Errors
    ///
    /// Returns the embedding or vector store error unchanged.
    pub async fn index(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        self.store.create_collection(&self.collection, self.embedder.dimensions()).await?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(collection = %self.collection, error = %e, "embedding failed during indexing");
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "gateway".to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let embedded: Vec<IndexedChunk> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { embedding, ..chunk.clone() })
            .collect();
        self.store.upsert(&self.collection, &embedded).await?;

        info!(collection = %self.collection, chunk_count = embedded.len(), "indexed policy chunks");
        Ok(embedded.len())
    }
}

#[async_trait]
impl SimilaritySearch for VectorIndexGateway {
    async fn search(&self, query: &str, k: usize, threshold: Option<f32>) -> Result<Vec<Chunk>> {
        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::RetrievalError(format!("query embedding failed: {e}"))
        })?;

        let results =
            self.store.search(&self.collection, &query_embedding, k).await.map_err(|e| {
                error!(collection = %self.collection, error = %e, "vector index search failed");
                RagError::RetrievalError(format!(
                    "search failed in collection '{}': {e}",
                    self.collection
                ))
            })?;

        let mut chunks: Vec<Chunk> = results
            .into_iter()
            .map(|result| {
                let similarity = result.score.clamp(0.0, 1.0);
                Chunk::new(result.chunk.id, result.chunk.text, result.chunk.metadata, similarity)
            })
            .filter(|chunk| threshold.is_none_or(|t| chunk.similarity >= t))
            .collect();
        chunks.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(requested = k, ?threshold, found = chunks.len(), "similarity search completed");
        Ok(chunks)
    }
}
