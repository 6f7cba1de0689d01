//! Text completion service trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One system + user prompt exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instructions that frame the model's role.
    pub system_prompt: String,
    /// The user turn.
    pub user_prompt: String,
    /// Sampling temperature. Validation and judging use `0.0`.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// The text a completion service produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Total tokens billed for the exchange.
    pub token_count: u32,
}

/// A language-model completion endpoint, used as an opaque service.
///
/// Implementations must not retry on their own; a failure is reported as
/// [`RagError::CompletionError`](crate::RagError::CompletionError) and the
/// caller decides what it means.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}
