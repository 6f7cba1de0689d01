//! Response types returned to callers of the pipeline.

use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::text::preview;

/// Answer returned when retrieval finds no sufficiently similar content.
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have information about that in the policy documents.";

/// Attribution record for one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    /// Source document name.
    pub document: String,
    /// Section heading.
    pub section: String,
    /// Query similarity rounded to three decimals.
    pub similarity: f32,
    /// Reranker score, when reranking ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    /// Leading slice of the chunk text.
    pub text_preview: String,
    /// Policy version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Policy effective date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
}

impl SourceAttribution {
    /// Build the attribution for `chunk`, keeping `preview_chars` characters of text.
    pub fn from_chunk(chunk: &Chunk, preview_chars: usize) -> Self {
        Self {
            document: chunk.metadata.source_name().to_string(),
            section: chunk.metadata.section_name().to_string(),
            similarity: (chunk.similarity * 1000.0).round() / 1000.0,
            rerank_score: chunk.rerank_score,
            text_preview: preview(&chunk.text, preview_chars),
            version: chunk.metadata.version.clone(),
            effective_date: chunk.metadata.effective_date.clone(),
        }
    }
}

/// Self-assessed groundedness of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationJudgment {
    /// `Some(true)` if the answer is supported by the context, `None` when the
    /// validation call itself failed.
    pub grounded: Option<bool>,
    /// Validator confidence, 0–100.
    pub confidence: u8,
    /// The validator's raw response, or the error text on failure.
    pub rationale: String,
}

/// Output of a single answer generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    /// The answer text.
    pub answer: String,
    /// Tokens billed for the generation call.
    pub tokens_used: u32,
    /// Wall-clock seconds spent in the generation call.
    pub response_time: f64,
}

/// Output of generation followed by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedAnswer {
    /// The answer text.
    pub answer: String,
    /// Tokens billed for the generation call.
    pub tokens_used: u32,
    /// Wall-clock seconds spent in the generation call.
    pub response_time: f64,
    /// The validator's judgment.
    pub validation: ValidationJudgment,
    /// Confidence taken from the validation judgment.
    pub confidence_score: u8,
}

/// The assembled answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer, or [`NO_INFORMATION_ANSWER`].
    pub answer: String,
    /// One attribution per retrieved chunk, in retrieval order.
    pub sources: Vec<SourceAttribution>,
    /// Confidence 0–100.
    pub confidence: u8,
    /// Number of chunks retrieved.
    pub retrieved_count: usize,
    /// Tokens billed for answer generation.
    #[serde(default)]
    pub tokens_used: u32,
    /// Seconds spent generating the answer.
    #[serde(default)]
    pub response_time: f64,
    /// Present when validation was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationJudgment>,
}

impl QueryResponse {
    /// The response for an empty retrieval.
    pub fn no_information() -> Self {
        Self {
            answer: NO_INFORMATION_ANSWER.to_string(),
            sources: Vec::new(),
            confidence: 0,
            retrieved_count: 0,
            tokens_used: 0,
            response_time: 0.0,
            validation: None,
        }
    }

    /// Source document names in retrieval order.
    pub fn source_documents(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.document.clone()).collect()
    }
}
