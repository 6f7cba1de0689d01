//! Evaluation of unlabeled probe questions.
//!
//! Probes have no ground truth, so the checks are intrinsic: did retrieval
//! find anything, was the answer judged grounded, do its numbers appear in
//! the retrieved policy text, and does the system refuse questions it cannot answer.
//! Probes bypass [`RagPipeline::query`](policy_rag::RagPipeline::query) to
//! see the raw retrieved chunks.

use policy_rag::text::numeric_tokens;
use policy_rag::{Chunk, NO_INFORMATION_ANSWER, format_context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;

/// Lowercase phrases that mark an answer as a refusal.
pub const REFUSAL_PHRASES: &[&str] = &[
    "i don't have information",
    "i do not have information",
    "i don't know",
    "i do not know",
    "no relevant policy documents",
    "not covered in the policy documents",
];

/// An unlabeled question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub id: String,
    pub question: String,
    /// The corpus is known not to answer this question.
    #[serde(default)]
    pub unanswerable: bool,
}

/// Parse a JSON array of probes.
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] on malformed JSON.
pub fn parse_probes(json: &str) -> Result<Vec<Probe>> {
    serde_json::from_str(json)
        .map_err(|e| EvalError::InvalidInput { kind: "probe set", message: e.to_string() })
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe_id: String,
    pub question: String,
    pub unanswerable: bool,
    pub answer: String,
    pub retrieved_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_similarity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_similarity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounded: Option<bool>,
    /// `None` when the answer contains no numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_fidelity: Option<f64>,
    pub refused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregates over completed probes (errored probes are only counted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub total: usize,
    pub errors: usize,
    /// Share of probes that retrieved at least one chunk.
    pub hit_rate: Option<f64>,
    pub grounded_rate: Option<f64>,
    pub avg_top_similarity: Option<f64>,
    pub avg_mean_similarity: Option<f64>,
    pub avg_numeric_fidelity: Option<f64>,
    pub unanswerable_count: usize,
    /// Share of unanswerable probes the system refused.
    pub refusal_rate: Option<f64>,
}

/// Results of [`Evaluator::evaluate_unlabeled_probes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeEvaluation {
    pub probes: Vec<ProbeResult>,
    pub summary: ProbeSummary,
}

/// Share of distinct numbers in `answer` that also occur in `source_text`.
///
/// Numbers are `\d+(?:\.\d+)?` tokens compared as strings. Returns `None`
/// when the answer has no numbers. Pass chunk text, not the formatted
/// context: its `[Context N]` labels would support small numbers.
pub fn numeric_fidelity(answer: &str, source_text: &str) -> Option<f64> {
    let claimed = numeric_tokens(answer);
    if claimed.is_empty() {
        return None;
    }
    let available = numeric_tokens(source_text);
    let supported = claimed.iter().filter(|n| available.contains(*n)).count();
    Some(supported as f64 / claimed.len() as f64)
}

/// Whether `answer` declines to answer.
pub fn is_refusal(answer: &str) -> bool {
    let normalized = answer.to_lowercase().replace('\u{2019}', "'");
    REFUSAL_PHRASES.iter().any(|phrase| normalized.contains(phrase))
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

impl ProbeSummary {
    pub fn aggregate(results: &[ProbeResult]) -> Self {
        let completed: Vec<&ProbeResult> = results.iter().filter(|r| r.error.is_none()).collect();
        let unanswerable: Vec<&&ProbeResult> = completed.iter().filter(|r| r.unanswerable).collect();
        let share = |flags: Vec<bool>| mean(flags.into_iter().map(|f| if f { 1.0 } else { 0.0 }));

        Self {
            total: results.len(),
            errors: results.len() - completed.len(),
            hit_rate: share(completed.iter().map(|r| r.retrieved_count > 0).collect()),
            grounded_rate: share(completed.iter().filter_map(|r| r.grounded).collect()),
            avg_top_similarity: mean(completed.iter().filter_map(|r| r.top_similarity).map(f64::from)),
            avg_mean_similarity: mean(
                completed.iter().filter_map(|r| r.mean_similarity).map(f64::from),
            ),
            avg_numeric_fidelity: mean(completed.iter().filter_map(|r| r.numeric_fidelity)),
            unanswerable_count: unanswerable.len(),
            refusal_rate: share(unanswerable.iter().map(|r| r.refused).collect()),
        }
    }
}

/// Retrieved chunk text joined without context labels.
pub(crate) fn source_text(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n")
}

impl Evaluator {
    /// Run each probe through retrieval and validated generation.
    ///
    /// A probe that retrieves nothing gets the fixed no-information answer
    /// without a completion call. Failures are recorded per probe.
    pub async fn evaluate_unlabeled_probes(&self, probes: &[Probe]) -> ProbeEvaluation {
        let mut results = Vec::with_capacity(probes.len());
        for probe in probes {
            results.push(self.evaluate_probe(probe).await);
        }
        let summary = ProbeSummary::aggregate(&results);
        info!(
            total = summary.total,
            hit_rate = ?summary.hit_rate,
            refusal_rate = ?summary.refusal_rate,
            "probes evaluated"
        );
        ProbeEvaluation { probes: results, summary }
    }

    async fn evaluate_probe(&self, probe: &Probe) -> ProbeResult {
        let mut result = ProbeResult {
            probe_id: probe.id.clone(),
            question: probe.question.clone(),
            unanswerable: probe.unanswerable,
            answer: String::new(),
            retrieved_count: 0,
            top_similarity: None,
            mean_similarity: None,
            grounded: None,
            numeric_fidelity: None,
            refused: false,
            error: None,
        };

        let chunks = match self.pipeline().retrieve(&probe.question, &self.query_options()).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(probe_id = %probe.id, error = %e, "probe retrieval failed");
                result.error = Some(e.to_string());
                return result;
            }
        };

        result.retrieved_count = chunks.len();
        if chunks.is_empty() {
            result.answer = NO_INFORMATION_ANSWER.to_string();
            result.refused = is_refusal(&result.answer);
            return result;
        }

        let similarities: Vec<f32> = chunks.iter().map(|c| c.similarity).collect();
        result.top_similarity = similarities.iter().copied().reduce(f32::max);
        result.mean_similarity =
            Some(similarities.iter().sum::<f32>() / similarities.len() as f32);

        let context = format_context(&chunks);
        match self.pipeline().generator().generate_with_validation(&probe.question, &context).await
        {
            Ok(validated) => {
                result.grounded = validated.validation.grounded;
                result.numeric_fidelity =
                    numeric_fidelity(&validated.answer, &source_text(&chunks));
                result.refused = is_refusal(&validated.answer);
                result.answer = validated.answer;
            }
            Err(e) => {
                warn!(probe_id = %probe.id, error = %e, "probe generation failed");
                result.error = Some(e.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_supported_numbers() {
        assert_eq!(
            numeric_fidelity("The minimum score is 580 and 620.", "The FHA minimum is 580."),
            Some(0.5)
        );
    }

    #[test]
    fn source_text_drops_context_labels() {
        use policy_rag::ChunkMetadata;

        let chunk = |id: &str, text: &str, similarity: f32| {
            Chunk::new(id, text, ChunkMetadata::new("a.md", "Bankruptcy"), similarity)
        };
        let chunks = vec![
            chunk("a", "Chapter 7 requires a waiting period.", 0.9),
            chunk("b", "Chapter 13 plans need court approval.", 0.8),
        ];
        let answer = "Wait 2 years after Chapter 13 discharge.";

        assert_eq!(numeric_fidelity(answer, &format_context(&chunks)), Some(1.0));
        assert_eq!(numeric_fidelity(answer, &source_text(&chunks)), Some(0.5));
    }

    #[test]
    fn answers_without_numbers_have_no_fidelity() {
        assert_eq!(numeric_fidelity("Two years of tax returns.", "24 months"), None);
    }

    #[test]
    fn decimals_are_single_tokens() {
        assert_eq!(numeric_fidelity("3.5% down", "requires 3.5 percent"), Some(1.0));
        assert_eq!(numeric_fidelity("3.5% down", "3 or 5 percent"), Some(0.0));
    }

    #[test]
    fn detects_refusals_with_typographic_apostrophes() {
        assert!(is_refusal("I don\u{2019}t have information about that."));
        assert!(is_refusal(NO_INFORMATION_ANSWER));
        assert!(!is_refusal("The minimum is 620."));
    }

    #[test]
    fn summary_excludes_errors_from_rates() {
        let base = ProbeResult {
            probe_id: "p".into(),
            question: "q".into(),
            unanswerable: true,
            answer: NO_INFORMATION_ANSWER.into(),
            retrieved_count: 0,
            top_similarity: None,
            mean_similarity: None,
            grounded: None,
            numeric_fidelity: None,
            refused: true,
            error: None,
        };
        let errored = ProbeResult { error: Some("down".into()), refused: false, ..base.clone() };
        let answered = ProbeResult {
            unanswerable: false,
            retrieved_count: 3,
            top_similarity: Some(0.9),
            mean_similarity: Some(0.8),
            grounded: Some(true),
            refused: false,
            ..base.clone()
        };

        let summary = ProbeSummary::aggregate(&[base, errored, answered]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.hit_rate, Some(0.5));
        assert_eq!(summary.grounded_rate, Some(1.0));
        assert_eq!(summary.unanswerable_count, 1);
        assert_eq!(summary.refusal_rate, Some(1.0));
    }

    #[test]
    fn parses_probe_json() {
        let probes =
            parse_probes(r#"[{"id": "p1", "question": "Crypto collateral?", "unanswerable": true}, {"id": "p2", "question": "DTI?"}]"#)
                .unwrap();
        assert!(probes[0].unanswerable);
        assert!(!probes[1].unanswerable);
        assert!(parse_probes("{").is_err());
    }
}
