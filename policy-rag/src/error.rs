//! Error types for the `policy-rag` crate.

use thiserror::Error;

/// Errors that can occur while answering a policy question.
///
/// Only [`RetrievalError`](RagError::RetrievalError),
/// [`RerankerError`](RagError::RerankerError) and
/// [`GenerationError`](RagError::GenerationError) escape
/// [`RagPipeline::query`](crate::RagPipeline::query). A failed validation call
/// is never an error: it degrades to an "unknown" judgment instead.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The similarity search gateway was unreachable or failed.
    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion service rejected or failed a request.
    #[error("Completion error ({provider}): {message}")]
    CompletionError {
        /// The completion service that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Answer generation failed. Fatal to the current query.
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for policy-rag operations.
pub type Result<T> = std::result::Result<T, RagError>;
