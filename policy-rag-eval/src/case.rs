//! Labeled test cases.

use std::fmt;

use policy_rag::text::jaccard_similarity;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Word-overlap Jaccard above which an answer counts as correct.
pub const ANSWER_OVERLAP_THRESHOLD: f32 = 0.3;

/// What kind of knowledge a question exercises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    /// Numeric limits such as minimum scores or maximum DTI.
    Threshold,
    #[default]
    Policy,
    Definition,
    EdgeCase,
    /// Needs facts from more than one section.
    MultiHop,
}

impl QuestionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Policy => "policy",
            Self::Definition => "definition",
            Self::EdgeCase => "edge_case",
            Self::MultiHop => "multi_hop",
        }
    }
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// A question with optional ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
    /// Document names that should be retrieved.
    #[serde(default)]
    pub expected_sources: Vec<String>,
    #[serde(default)]
    pub category: QuestionCategory,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Terms a correct answer should mention.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TestCase {
    /// Create a policy question of medium difficulty with no ground truth.
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            expected_answer: None,
            expected_sources: Vec::new(),
            category: QuestionCategory::default(),
            difficulty: Difficulty::default(),
            keywords: Vec::new(),
        }
    }

    pub fn with_expected_answer(mut self, answer: impl Into<String>) -> Self {
        self.expected_answer = Some(answer.into());
        self
    }

    pub fn with_expected_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: QuestionCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Judge `answer` against the expected answer, if there is one.
    pub fn judge_answer(&self, answer: &str) -> Option<bool> {
        self.expected_answer
            .as_deref()
            .map(|expected| answer_is_correct(answer, expected, &self.keywords))
    }
}

/// An answer is correct when its word overlap with `expected` exceeds
/// [`ANSWER_OVERLAP_THRESHOLD`], or when it mentions every keyword
/// (case-insensitive). An empty keyword list never satisfies the second rule.
pub fn answer_is_correct(answer: &str, expected: &str, keywords: &[String]) -> bool {
    if jaccard_similarity(answer, expected) > ANSWER_OVERLAP_THRESHOLD {
        return true;
    }
    let answer = answer.to_lowercase();
    !keywords.is_empty() && keywords.iter().all(|kw| answer.contains(&kw.to_lowercase()))
}

/// Parse a JSON array of test cases.
///
/// # Errors
///
/// Returns [`EvalError::InvalidInput`] on malformed JSON or duplicate ids.
pub fn parse_test_set(json: &str) -> Result<Vec<TestCase>> {
    let cases: Vec<TestCase> = serde_json::from_str(json)
        .map_err(|e| EvalError::InvalidInput { kind: "test set", message: e.to_string() })?;

    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = cases.iter().find(|c| !seen.insert(c.id.as_str())) {
        return Err(EvalError::InvalidInput {
            kind: "test set",
            message: format!("duplicate test case id '{}'", dup.id),
        });
    }
    Ok(cases)
}

/// The built-in credit-policy sample set.
pub fn sample_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("tc_001", "What is the minimum credit score for FHA loans?")
            .with_expected_answer("580 for maximum financing, 500-579 requires 10% down payment")
            .with_expected_sources(["credit_scoring_manual.md"])
            .with_category(QuestionCategory::Threshold)
            .with_difficulty(Difficulty::Easy)
            .with_keywords(["580", "FHA", "minimum"]),
        TestCase::new("tc_002", "What is the maximum DTI ratio for conventional mortgages?")
            .with_expected_answer("43% for qualified mortgages, up to 50% with compensating factors")
            .with_expected_sources(["risk_assessment_guidelines.md"])
            .with_category(QuestionCategory::Threshold)
            .with_difficulty(Difficulty::Medium)
            .with_keywords(["43%", "50%", "DTI"]),
        TestCase::new("tc_003", "What documentation is required for self-employed borrowers?")
            .with_expected_answer(
                "Two years of tax returns, profit and loss statements, business bank statements",
            )
            .with_expected_sources(["underwriting_policies.md"])
            .with_category(QuestionCategory::Policy)
            .with_difficulty(Difficulty::Medium)
            .with_keywords(["tax returns", "self-employed", "documentation"]),
        TestCase::new("tc_004", "What is the waiting period after bankruptcy?")
            .with_expected_answer(
                "Chapter 7: 4 years for conventional, 2 years for FHA. Chapter 13: 2 years from discharge",
            )
            .with_expected_sources(["underwriting_policies.md"])
            .with_category(QuestionCategory::Policy)
            .with_difficulty(Difficulty::Hard)
            .with_keywords(["bankruptcy", "waiting period", "Chapter 7"]),
        TestCase::new("tc_005", "What credit score is needed for the best interest rates?")
            .with_expected_answer("760+ for the best rates, excellent credit tier")
            .with_expected_sources(["credit_scoring_manual.md"])
            .with_category(QuestionCategory::Threshold)
            .with_difficulty(Difficulty::Easy)
            .with_keywords(["760", "best rates", "excellent"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_set_is_fully_labeled() {
        let cases = sample_test_cases();
        assert_eq!(cases.len(), 5);
        assert!(cases.iter().all(|c| c.expected_answer.is_some()));
        assert!(cases.iter().all(|c| !c.expected_sources.is_empty()));
        assert_eq!(cases[0].category, QuestionCategory::Threshold);
    }

    #[test]
    fn keywords_alone_make_an_answer_correct() {
        let case = &sample_test_cases()[0];
        let answer = "The FHA minimum is 580 (Source: credit_scoring_manual.md - FHA Loans)";
        assert_eq!(case.judge_answer(answer), Some(true));
    }

    #[test]
    fn unrelated_answer_is_incorrect() {
        let case = &sample_test_cases()[1];
        assert_eq!(case.judge_answer("I don't know."), Some(false));
        assert_eq!(TestCase::new("x", "q").judge_answer("anything"), None);
    }

    #[test]
    fn parses_minimal_json_with_defaults() {
        let cases =
            parse_test_set(r#"[{"id": "a", "question": "q?", "category": "edge_case"}]"#).unwrap();
        assert_eq!(cases[0].category, QuestionCategory::EdgeCase);
        assert_eq!(cases[0].difficulty, Difficulty::Medium);
        assert!(cases[0].expected_sources.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = parse_test_set(r#"[{"id": "a", "question": "1"}, {"id": "a", "question": "2"}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
