//! Embedding provider trait used by the vector-index gateway.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that turns text into a dense vector.
///
/// The gateway embeds each query with [`embed`](EmbeddingProvider::embed) and
/// indexes policy chunks with [`embed_batch`](EmbeddingProvider::embed_batch).
/// The default batch implementation embeds one text at a time; backends with a
/// native batch endpoint should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;
}
