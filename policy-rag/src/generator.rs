//! Answer generation and groundedness validation.
//!
//! [`AnswerGenerator`] makes at most two completion calls per question: one
//! to write the answer from the retrieved context, and an optional second one
//! asking the model whether that answer is supported by the same context.
//! Generation failures are fatal; validation failures degrade to an
//! "unknown" judgment with confidence 50.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use tracing::{error, info, warn};

use crate::completion::{CompletionRequest, CompletionService};
use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::response::{GeneratedAnswer, ValidatedAnswer, ValidationJudgment};

/// System prompt for answer generation.
pub const POLICY_SYSTEM_PROMPT: &str = "\
You are a precise credit policy assistant. You answer questions about credit scoring, \
underwriting policies and risk assessment guidelines.

Rules:
1. Use ONLY the provided context documents.
2. If the context does not contain the answer, reply \"I don't have information about that in the policy documents.\"
3. Cite the policy document and section for every fact you state.
4. Quote numeric thresholds (credit scores, percentages, amounts, waiting periods) exactly as written.
5. When several sources apply, mention all of them.
6. Do not speculate or add information that is not in the context.
7. If the context is ambiguous, say so.

Format: lead with the direct answer, then the specific conditions and thresholds, \
then citations as (Source: <document> - <section>).";

const VALIDATOR_SYSTEM_PROMPT: &str =
    "You are a quality assurance reviewer checking answers against their source documents.";

/// Confidence used when validation fails outright.
pub const DEGRADED_CONFIDENCE: u8 = 50;
/// Confidence assumed for a grounded verdict without a parsable score.
const GROUNDED_DEFAULT_CONFIDENCE: u8 = 90;
/// Confidence assumed for an ungrounded verdict without a parsable score.
const UNGROUNDED_DEFAULT_CONFIDENCE: u8 = 50;
/// Number of leading characters searched for the grounded verdict.
const VERDICT_WINDOW: usize = 100;

static CONFIDENCE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)confidence["\s:]+(\d+)"#).expect("valid confidence pattern")
});

/// Builds the user turn for answer generation.
pub fn answer_prompt(query: &str, context: &str) -> String {
    format!(
        "Answer the question using the policy documents below.\n\n\
         QUESTION: {query}\n\n\
         POLICY CONTEXT:\n{context}\n\n\
         Give a precise answer based only on the information above."
    )
}

/// Builds the user turn for groundedness validation.
pub fn validation_prompt(answer: &str, context: &str, query: &str) -> String {
    format!(
        "Decide whether the answer below is fully supported by the context.\n\n\
         QUESTION: {query}\n\n\
         ANSWER: {answer}\n\n\
         CONTEXT: {context}\n\n\
         Respond with:\n\
         1. GROUNDED: Yes/No (is every statement in the answer supported by the context?)\n\
         2. CONFIDENCE: 0-100 (how confident you are in this assessment)\n\
         3. ISSUES: statements in the answer that the context does not support, if any\n\n\
         Format the response as JSON with keys: grounded, confidence, issues"
    )
}

/// Parse a validator response into `(grounded, confidence)`.
///
/// The verdict is grounded when the first 100 characters contain "yes"
/// (any case). Confidence comes from a `confidence` field, clamped to 100;
/// without one it defaults to 90 when grounded and 50 otherwise.
pub fn parse_validation(text: &str) -> (bool, u8) {
    let head: String = text.chars().take(VERDICT_WINDOW).collect::<String>().to_lowercase();
    let grounded = head.contains("yes");

    let parsed = CONFIDENCE_FIELD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|value| value.min(100) as u8);

    let confidence = parsed.unwrap_or_else(|| {
        warn!(grounded, "validator response had no parsable confidence; using default");
        if grounded { GROUNDED_DEFAULT_CONFIDENCE } else { UNGROUNDED_DEFAULT_CONFIDENCE }
    });
    (grounded, confidence)
}

/// Generates grounded answers and validates them.
pub struct AnswerGenerator {
    service: Arc<dyn CompletionService>,
    temperature: f32,
    max_tokens: u32,
    validation_max_tokens: u32,
}

impl AnswerGenerator {
    /// Create a generator using the sampling settings from `config`.
    pub fn new(service: Arc<dyn CompletionService>, config: &RagConfig) -> Self {
        Self {
            service,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            validation_max_tokens: config.validation_max_tokens,
        }
    }

    /// The completion service behind this generator.
    pub fn service(&self) -> &Arc<dyn CompletionService> {
        &self.service
    }

    /// Write an answer to `query` from `context`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the completion call fails. The
    /// call is not retried.
    pub async fn generate_answer(&self, query: &str, context: &str) -> Result<GeneratedAnswer> {
        let request = CompletionRequest {
            system_prompt: POLICY_SYSTEM_PROMPT.to_string(),
            user_prompt: answer_prompt(query, context),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let started = Instant::now();
        let completion = self.service.complete(request).await.map_err(|e| {
            error!(service = self.service.name(), error = %e, "answer generation failed");
            RagError::GenerationError(e.to_string())
        })?;
        let response_time = started.elapsed().as_secs_f64();

        info!(
            service = self.service.name(),
            tokens = completion.token_count,
            elapsed_secs = response_time,
            "generated answer"
        );
        Ok(GeneratedAnswer {
            answer: completion.text,
            tokens_used: completion.token_count,
            response_time,
        })
    }

    /// Ask the model whether `answer` is supported by `context`.
    ///
    /// Never fails: if the completion call errors, the judgment is
    /// `grounded: None` with confidence 50 and the error text as rationale.
    pub async fn validate_answer(
        &self,
        answer: &str,
        context: &str,
        query: &str,
    ) -> ValidationJudgment {
        let request = CompletionRequest {
            system_prompt: VALIDATOR_SYSTEM_PROMPT.to_string(),
            user_prompt: validation_prompt(answer, context, query),
            temperature: 0.0,
            max_tokens: self.validation_max_tokens,
        };

        match self.service.complete(request).await {
            Ok(completion) => {
                let (grounded, confidence) = parse_validation(&completion.text);
                info!(grounded, confidence, "validated answer");
                ValidationJudgment {
                    grounded: Some(grounded),
                    confidence,
                    rationale: completion.text,
                }
            }
            Err(e) => {
                warn!(service = self.service.name(), error = %e, "validation degraded");
                ValidationJudgment {
                    grounded: None,
                    confidence: DEGRADED_CONFIDENCE,
                    rationale: format!("Validation error: {e}"),
                }
            }
        }
    }

    /// Generate an answer, then validate it.
    ///
    /// # Errors
    ///
    /// Only generation failures are returned; validation never fails.
    pub async fn generate_with_validation(
        &self,
        query: &str,
        context: &str,
    ) -> Result<ValidatedAnswer> {
        let generated = self.generate_answer(query, context).await?;
        let validation = self.validate_answer(&generated.answer, context, query).await;
        Ok(ValidatedAnswer {
            answer: generated.answer,
            tokens_used: generated.tokens_used,
            response_time: generated.response_time,
            confidence_score: validation.confidence,
            validation,
        })
    }
}
