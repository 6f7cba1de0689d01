//! Error types for the `policy-rag-eval` crate.

use thiserror::Error;

/// Errors raised while loading evaluation inputs.
///
/// Running an evaluation never fails as a whole: per-case failures are
/// recorded in the results instead.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A test set or probe file could not be parsed.
    #[error("Invalid {kind}: {message}")]
    InvalidInput {
        /// What was being parsed, e.g. "test set".
        kind: &'static str,
        /// A description of the failure.
        message: String,
    },

    /// An error from the question-answering pipeline.
    #[error(transparent)]
    Rag(#[from] policy_rag::RagError),
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
