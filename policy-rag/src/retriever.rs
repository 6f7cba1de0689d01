//! Retrieval strategies over the similarity search gateway.
//!
//! The [`Retriever`] offers three strategies:
//!
//! - [`retrieve`](Retriever::retrieve): plain threshold retrieval in gateway order.
//! - [`retrieve_with_reranking`](Retriever::retrieve_with_reranking): fetch
//!   `2 × top_k` candidates, rerank them, keep `top_k`.
//! - [`retrieve_with_mmr`](Retriever::retrieve_with_mmr): fetch `3 × top_k`
//!   candidates and select a diverse `top_k` by maximal marginal relevance.
//!
//! `top_k`, `threshold` and `diversity_weight` arguments override the
//! instance defaults for one call only. An empty result is a normal outcome at every stage.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::context::{NO_CONTEXT_FOUND, format_context};
use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::gateway::SimilaritySearch;
use crate::mmr::select_mmr;
use crate::reranker::{PolicySignalReranker, Reranker};

/// Candidate multiplier for reranked retrieval.
const RERANK_CANDIDATE_FACTOR: usize = 2;
/// Candidate multiplier for MMR retrieval.
const MMR_CANDIDATE_FACTOR: usize = 3;

/// Retrieves policy chunks for a query.
pub struct Retriever {
    gateway: Arc<dyn SimilaritySearch>,
    reranker: Arc<dyn Reranker>,
    top_k: usize,
    similarity_threshold: f32,
    diversity_weight: f32,
}

impl Retriever {
    /// Create a retriever with the [`PolicySignalReranker`].
    pub fn new(
        gateway: Arc<dyn SimilaritySearch>,
        top_k: usize,
        similarity_threshold: f32,
        diversity_weight: f32,
    ) -> Self {
        Self {
            gateway,
            reranker: Arc::new(PolicySignalReranker::default()),
            top_k,
            similarity_threshold,
            diversity_weight,
        }
    }

    /// Replace the reranker used by [`retrieve_with_reranking`](Self::retrieve_with_reranking).
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Default number of chunks returned.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Default similarity threshold.
    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Default MMR diversity weight.
    pub fn diversity_weight(&self) -> f32 {
        self.diversity_weight
    }

    /// Fetch up to `top_k` chunks at or above the threshold, in gateway order.
    ///
    /// # Errors
    ///
    /// Propagates gateway failures unchanged.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<Chunk>> {
        let k = top_k.unwrap_or(self.top_k);
        let threshold = threshold.unwrap_or(self.similarity_threshold);
        debug!(k, threshold, "retrieving candidates");

        let chunks = self.gateway.search(query, k, Some(threshold)).await.inspect_err(|e| {
            error!(error = %e, "similarity search failed");
        })?;

        info!(k, threshold, found = chunks.len(), "retrieved chunks");
        Ok(chunks)
    }

    /// Fetch `2 × top_k` candidates, rerank them and keep the best `top_k`.
    ///
    /// # Errors
    ///
    /// Propagates gateway failures unchanged; reranker failures surface as
    /// [`RagError::RerankerError`].
    pub async fn retrieve_with_reranking(
        &self,
        query: &str,
        top_k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<Chunk>> {
        let final_k = top_k.unwrap_or(self.top_k);
        let candidates =
            self.retrieve(query, Some(final_k * RERANK_CANDIDATE_FACTOR), threshold).await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut reranked = self.reranker.rerank(query, candidates).await.map_err(|e| {
            error!(error = %e, "reranking failed");
            match e {
                err @ RagError::RerankerError { .. } => err,
                other => RagError::RerankerError {
                    reranker: "retriever".to_string(),
                    message: other.to_string(),
                },
            }
        })?;
        reranked.truncate(final_k);

        debug!(kept = reranked.len(), "reranked chunks");
        Ok(reranked)
    }

    /// Fetch `3 × top_k` candidates and select a diverse `top_k` by MMR.
    ///
    /// `diversity_weight` in `[0, 1]`: 0 keeps pure relevance order, higher
    /// values penalize overlap with already-selected chunks more. `None` uses
    /// the configured weight.
    ///
    /// # Errors
    ///
    /// Propagates gateway failures unchanged.
    pub async fn retrieve_with_mmr(
        &self,
        query: &str,
        top_k: Option<usize>,
        threshold: Option<f32>,
        diversity_weight: Option<f32>,
    ) -> Result<Vec<Chunk>> {
        let final_k = top_k.unwrap_or(self.top_k);
        let diversity_weight = diversity_weight.unwrap_or(self.diversity_weight);
        let candidates =
            self.retrieve(query, Some(final_k * MMR_CANDIDATE_FACTOR), threshold).await?;
        let selected = select_mmr(candidates, final_k, diversity_weight);

        debug!(kept = selected.len(), diversity_weight, "selected chunks by mmr");
        Ok(selected)
    }

    /// Retrieve and format context for a prompt.
    ///
    /// Returns [`NO_CONTEXT_FOUND`] instead of an empty string when nothing
    /// clears the threshold.
    ///
    /// # Errors
    ///
    /// Same as the underlying retrieval strategy.
    pub async fn get_context_for_llm(
        &self,
        query: &str,
        top_k: Option<usize>,
        use_reranking: bool,
    ) -> Result<String> {
        let chunks = if use_reranking {
            self.retrieve_with_reranking(query, top_k, None).await?
        } else {
            self.retrieve(query, top_k, None).await?
        };

        if chunks.is_empty() {
            return Ok(NO_CONTEXT_FOUND.to_string());
        }
        Ok(format_context(&chunks))
    }
}
