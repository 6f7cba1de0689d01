//! Reranking of similarity-ranked candidates.

use async_trait::async_trait;

use crate::document::Chunk;
use crate::error::Result;
use crate::text::{query_terms, shared_integer_count};

/// A reranker that re-scores and reorders retrieved chunks.
///
/// Implementations set [`Chunk::rerank_score`] and return the chunks ordered
/// by that score, best first. Truncation is left to the caller.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank chunks for the original query.
    async fn rerank(&self, query: &str, chunks: Vec<Chunk>) -> Result<Vec<Chunk>>;
}

/// Boosts exact-match signals that embeddings under-weight in policy text.
///
/// Starting from a chunk's similarity, the reranker adds
/// `section_term_boost` for every query term found in the chunk's section
/// heading and `numeric_match_boost` for every distinct number the query and
/// chunk text share (credit scores, DTI percentages, reserve months). The
/// result is capped at `1.0` and chunks are stably sorted by it, so equal
/// scores keep their retrieval order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicySignalReranker {
    /// Added per query term appearing in the section heading.
    pub section_term_boost: f32,
    /// Added per distinct number shared by query and chunk text.
    pub numeric_match_boost: f32,
}

impl Default for PolicySignalReranker {
    fn default() -> Self {
        Self { section_term_boost: 0.05, numeric_match_boost: 0.03 }
    }
}

impl PolicySignalReranker {
    /// Compute the adjusted score of one chunk.
    pub fn score(&self, query: &str, chunk: &Chunk) -> f32 {
        let mut score = chunk.similarity;

        if let Some(section) = &chunk.metadata.section {
            let section = section.to_lowercase();
            let matches =
                query_terms(query).iter().filter(|term| section.contains(term.as_str())).count();
            score += self.section_term_boost * matches as f32;
        }

        let shared = shared_integer_count(&query.to_lowercase(), &chunk.text.to_lowercase());
        score += self.numeric_match_boost * shared as f32;

        score.min(1.0)
    }

    /// Score and order chunks without going through the async trait.
    pub fn rerank_sync(&self, query: &str, mut chunks: Vec<Chunk>) -> Vec<Chunk> {
        for chunk in &mut chunks {
            chunk.rerank_score = Some(self.score(query, chunk));
        }
        // `sort_by` is stable: ties keep retrieval order.
        chunks.sort_by(|a, b| {
            b.effective_score()
                .partial_cmp(&a.effective_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks
    }
}

#[async_trait]
impl Reranker for PolicySignalReranker {
    async fn rerank(&self, query: &str, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        Ok(self.rerank_sync(query, chunks))
    }
}

/// A reranker that leaves order and scores untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        Ok(chunks)
    }
}
