//! LLM-judged answer relevancy.

use std::sync::{Arc, LazyLock};

use policy_rag::{CompletionRequest, CompletionService};
use regex::Regex;
use serde_json::Value;
use tracing::warn;

const JUDGE_SYSTEM_PROMPT: &str =
    "You are an impartial evaluator scoring how well answers address questions.";

static RELEVANCY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)relevancy["\s:]+(\d+)"#).expect("valid relevancy pattern")
});

fn relevancy_prompt(question: &str, answer: &str) -> String {
    format!(
        "Rate how relevant the answer is to the question on a scale from 0 to 100.\n\
         100 means the answer directly and completely addresses the question; \
         0 means it is unrelated. A correct refusal to an unanswerable question \
         is still relevant.\n\n\
         QUESTION: {question}\n\n\
         ANSWER: {answer}\n\n\
         Respond only with JSON: {{\"relevancy\": <integer 0-100>, \"reason\": \"<one sentence>\"}}"
    )
}

/// Extract a 0–100 relevancy score from a judge response.
///
/// Accepts a JSON object with a numeric `relevancy` field, optionally
/// wrapped in prose or a code fence, then falls back to a
/// `relevancy: <n>` pattern. Values above 100 are clamped.
pub fn parse_relevancy(text: &str) -> Option<u8> {
    let from_json = text
        .find('{')
        .zip(text.rfind('}'))
        .filter(|(start, end)| start < end)
        .and_then(|(start, end)| serde_json::from_str::<Value>(&text[start..=end]).ok())
        .and_then(|value| value.get("relevancy").and_then(Value::as_f64))
        .filter(|score| score.is_finite() && *score >= 0.0);

    let score = from_json.or_else(|| {
        RELEVANCY_FIELD
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    })?;
    Some(score.round().min(100.0) as u8)
}

/// Scores answer relevancy with a completion service.
pub struct RelevancyJudge {
    service: Arc<dyn CompletionService>,
    max_tokens: u32,
}

impl RelevancyJudge {
    pub fn new(service: Arc<dyn CompletionService>, max_tokens: u32) -> Self {
        Self { service, max_tokens }
    }

    /// Score `answer` for `question`, 0–100.
    ///
    /// Returns `None`, with a warning, if the call fails or the response
    /// cannot be parsed.
    pub async fn score(&self, question: &str, answer: &str) -> Option<u8> {
        let request = CompletionRequest {
            system_prompt: JUDGE_SYSTEM_PROMPT.to_string(),
            user_prompt: relevancy_prompt(question, answer),
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let completion = match self.service.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(judge = self.service.name(), error = %e, "relevancy judge call failed");
                return None;
            }
        };

        let score = parse_relevancy(&completion.text);
        if score.is_none() {
            warn!(judge = self.service.name(), response = %completion.text, "unparsable relevancy score");
        }
        score
    }
}
