//! Batch evaluation of the pipeline against labeled test cases.
//!
//! Every case runs through [`RagPipeline::query_with_chunks`] with validation
//! enabled, so each result carries the validator's groundedness verdict and a
//! numeric hallucination check against the retrieved text, alongside the
//! ranking metrics and the optional relevancy score.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use policy_rag::{QueryOptions, RagPipeline};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::case::{QuestionCategory, TestCase, answer_is_correct};
use crate::hallucination::has_numeric_hallucination;
use crate::judge::RelevancyJudge;
use crate::metrics::{RankingMetrics, dedup_sources};
use crate::probes::source_text;

/// Confidence at or above which an answer counts as high-confidence.
pub const HIGH_CONFIDENCE: u8 = 80;

/// Outcome of one evaluated question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<QuestionCategory>,
    pub success: bool,
    pub answer: String,
    pub confidence: u8,
    pub retrieved_count: usize,
    /// Wall-clock seconds for the whole query.
    pub response_time: f64,
    /// Retrieved document names, de-duplicated, in rank order.
    pub sources: Vec<String>,
    pub expected_sources: Vec<String>,
    /// Whether any expected source was retrieved. Present when the case has
    /// expected sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_match: Option<bool>,
    /// Present when the case has expected sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingMetrics>,
    /// The answer states a number missing from the retrieved text.
    #[serde(default)]
    pub has_hallucination: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faithfulness_confidence: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_relevancy: Option<u8>,
    /// Present when the case has an expected answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregates over a test set.
///
/// Timing, confidence and faithfulness averages cover successful cases;
/// ranking averages cover successful cases with expected sources. Averages
/// over an empty population are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub total_tests: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub avg_confidence: Option<f64>,
    pub avg_response_time: Option<f64>,
    pub avg_sources_retrieved: Option<f64>,
    pub high_confidence_rate: Option<f64>,
    /// Share of cases with expected sources that retrieved at least one of them.
    pub source_accuracy: Option<f64>,
    /// Share of cases that cited at least one source.
    pub citation_coverage: Option<f64>,
    /// Share of answers stating a number missing from the retrieved text.
    pub hallucination_rate: Option<f64>,
    /// Cases that contributed to the ranking averages.
    pub ranked_cases: usize,
    pub avg_precision_at_1: Option<f64>,
    pub avg_precision_at_3: Option<f64>,
    pub avg_precision_at_5: Option<f64>,
    pub avg_recall_at_5: Option<f64>,
    pub avg_mrr: Option<f64>,
    pub avg_ndcg_at_5: Option<f64>,
    pub avg_faithfulness_confidence: Option<f64>,
    /// Share of grounded verdicts among cases with a known verdict.
    pub faithfulness_grounded_rate: Option<f64>,
    pub avg_answer_relevancy: Option<f64>,
    /// Share of correct answers among cases with an expected answer.
    pub answer_accuracy: Option<f64>,
}

/// What a test set contains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub total_cases: usize,
    pub with_expected_sources: usize,
    pub with_expected_answer: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl Coverage {
    pub fn of(cases: &[TestCase]) -> Self {
        let mut by_category = BTreeMap::new();
        for case in cases {
            *by_category.entry(case.category.as_str().to_string()).or_insert(0) += 1;
        }
        Self {
            total_cases: cases.len(),
            with_expected_sources: cases.iter().filter(|c| !c.expected_sources.is_empty()).count(),
            with_expected_answer: cases.iter().filter(|c| c.expected_answer.is_some()).count(),
            by_category,
        }
    }
}

/// Results of [`Evaluator::evaluate_test_set`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSetEvaluation {
    pub metrics: EvaluationMetrics,
    pub results: Vec<CaseResult>,
    /// Cases that errored or answered incorrectly, by id (question when unnamed).
    #[serde(default)]
    pub failed_cases: Vec<String>,
    pub coverage: Coverage,
}

impl TestSetEvaluation {
    /// Aggregate `results` and collect the failed cases.
    pub fn from_results(results: Vec<CaseResult>, coverage: Coverage) -> Self {
        let failed_cases = results
            .iter()
            .filter(|r| !r.success || r.answer_correct == Some(false))
            .map(|r| r.case_id.clone().unwrap_or_else(|| r.question.clone()))
            .collect();
        Self { metrics: EvaluationMetrics::aggregate(&results), results, failed_cases, coverage }
    }
}

/// A named, timestamped test-set evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRun {
    /// Short random identifier.
    pub id: String,
    pub test_set_name: String,
    pub run_at: DateTime<Utc>,
    #[serde(flatten)]
    pub evaluation: TestSetEvaluation,
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn rate<I: IntoIterator<Item = bool>>(flags: I) -> Option<f64> {
    mean(flags.into_iter().map(|f| if f { 1.0 } else { 0.0 }))
}

impl EvaluationMetrics {
    /// Aggregate per-case results.
    pub fn aggregate(results: &[CaseResult]) -> Self {
        let successful: Vec<&CaseResult> = results.iter().filter(|r| r.success).collect();
        let ranked: Vec<RankingMetrics> = successful.iter().filter_map(|r| r.ranking).collect();
        let ranking_mean = |f: fn(&RankingMetrics) -> f64| mean(ranked.iter().map(f));

        Self {
            total_tests: results.len(),
            successful: successful.len(),
            failed: results.len() - successful.len(),
            success_rate: if results.is_empty() {
                0.0
            } else {
                successful.len() as f64 / results.len() as f64
            },
            avg_confidence: mean(successful.iter().map(|r| f64::from(r.confidence))),
            avg_response_time: mean(successful.iter().map(|r| r.response_time)),
            avg_sources_retrieved: mean(successful.iter().map(|r| r.retrieved_count as f64)),
            high_confidence_rate: rate(successful.iter().map(|r| r.confidence >= HIGH_CONFIDENCE)),
            source_accuracy: rate(successful.iter().filter_map(|r| r.source_match)),
            citation_coverage: rate(successful.iter().map(|r| !r.sources.is_empty())),
            hallucination_rate: rate(successful.iter().map(|r| r.has_hallucination)),
            ranked_cases: ranked.len(),
            avg_precision_at_1: ranking_mean(|m| m.precision_at_1),
            avg_precision_at_3: ranking_mean(|m| m.precision_at_3),
            avg_precision_at_5: ranking_mean(|m| m.precision_at_5),
            avg_recall_at_5: ranking_mean(|m| m.recall_at_5),
            avg_mrr: ranking_mean(|m| m.mrr),
            avg_ndcg_at_5: ranking_mean(|m| m.ndcg_at_5),
            avg_faithfulness_confidence: mean(
                successful.iter().filter_map(|r| r.faithfulness_confidence).map(f64::from),
            ),
            faithfulness_grounded_rate: rate(successful.iter().filter_map(|r| r.grounded)),
            avg_answer_relevancy: mean(
                successful.iter().filter_map(|r| r.answer_relevancy).map(f64::from),
            ),
            answer_accuracy: rate(successful.iter().filter_map(|r| r.answer_correct)),
        }
    }
}

/// Runs the pipeline over test cases and probes.
pub struct Evaluator {
    pipeline: Arc<RagPipeline>,
    judge: Option<RelevancyJudge>,
    concurrency: usize,
    top_k: Option<usize>,
}

impl Evaluator {
    /// Create an evaluator that judges relevancy with the pipeline's own
    /// completion service and runs one case at a time.
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        let judge = RelevancyJudge::new(
            pipeline.generator().service().clone(),
            pipeline.config().judge_max_tokens,
        );
        Self { pipeline, judge: Some(judge), concurrency: 1, top_k: None }
    }

    /// Use a separate relevancy judge.
    pub fn with_judge(mut self, judge: RelevancyJudge) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Skip relevancy judging.
    pub fn without_relevancy(mut self) -> Self {
        self.judge = None;
        self
    }

    /// Evaluate up to `concurrency` cases at once. Values below 1 mean 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Override the pipeline's `top_k` for every evaluated question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.pipeline
    }

    pub(crate) fn query_options(&self) -> QueryOptions {
        QueryOptions { top_k: self.top_k, ..QueryOptions::default() }
    }

    /// Evaluate one question against optional ground truth.
    ///
    /// Never fails: pipeline errors are recorded in the result with
    /// `success: false`.
    pub async fn evaluate_query(
        &self,
        question: &str,
        expected_answer: Option<&str>,
        expected_sources: &[String],
    ) -> CaseResult {
        self.run_case(None, question, None, expected_answer, expected_sources, &[]).await
    }

    /// Evaluate one labeled test case, including keyword-based correctness.
    pub async fn evaluate_case(&self, case: &TestCase) -> CaseResult {
        self.run_case(
            Some(&case.id),
            &case.question,
            Some(case.category),
            case.expected_answer.as_deref(),
            &case.expected_sources,
            &case.keywords,
        )
        .await
    }

    async fn run_case(
        &self,
        case_id: Option<&str>,
        question: &str,
        category: Option<QuestionCategory>,
        expected_answer: Option<&str>,
        expected_sources: &[String],
        keywords: &[String],
    ) -> CaseResult {
        let options = self.query_options().with_validation(true);
        let started = Instant::now();
        let outcome = self.pipeline.query_with_chunks(question, &options).await;
        let response_time = started.elapsed().as_secs_f64();

        let (response, chunks) = match outcome {
            Ok(answered) => answered,
            Err(e) => {
                error!(case_id, error = %e, "evaluation query failed");
                return CaseResult {
                    case_id: case_id.map(str::to_string),
                    question: question.to_string(),
                    category,
                    success: false,
                    answer: String::new(),
                    confidence: 0,
                    retrieved_count: 0,
                    response_time,
                    sources: Vec::new(),
                    expected_sources: expected_sources.to_vec(),
                    source_match: None,
                    ranking: None,
                    has_hallucination: false,
                    grounded: None,
                    faithfulness_confidence: None,
                    answer_relevancy: None,
                    answer_correct: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let sources = dedup_sources(&response.source_documents());
        let ranking = RankingMetrics::compute(&sources, expected_sources);
        let source_match = (!expected_sources.is_empty()).then(|| {
            expected_sources.iter().any(|e| sources.iter().any(|s| s.contains(e.as_str())))
        });
        let has_hallucination = has_numeric_hallucination(&response.answer, &source_text(&chunks));
        let answer_relevancy = match &self.judge {
            Some(judge) => judge.score(question, &response.answer).await,
            None => None,
        };
        let answer_correct =
            expected_answer.map(|expected| answer_is_correct(&response.answer, expected, keywords));
        let (grounded, faithfulness_confidence) = match &response.validation {
            Some(v) => (v.grounded, Some(v.confidence)),
            None => (None, None),
        };

        info!(
            case_id,
            confidence = response.confidence,
            retrieved = response.retrieved_count,
            ?grounded,
            has_hallucination,
            "evaluated question"
        );

        CaseResult {
            case_id: case_id.map(str::to_string),
            question: question.to_string(),
            category,
            success: true,
            answer: response.answer,
            confidence: response.confidence,
            retrieved_count: response.retrieved_count,
            response_time,
            sources,
            expected_sources: expected_sources.to_vec(),
            source_match,
            ranking,
            has_hallucination,
            grounded,
            faithfulness_confidence,
            answer_relevancy,
            answer_correct,
            error: None,
        }
    }

    /// Evaluate every case and aggregate. Results keep case order.
    pub async fn evaluate_test_set(&self, cases: &[TestCase]) -> TestSetEvaluation {
        info!(cases = cases.len(), concurrency = self.concurrency, "evaluating test set");

        let results: Vec<CaseResult> = stream::iter(cases)
            .map(|case| self.evaluate_case(case))
            .buffered(self.concurrency)
            .collect()
            .await;
        let evaluation = TestSetEvaluation::from_results(results, Coverage::of(cases));

        info!(
            successful = evaluation.metrics.successful,
            failed = evaluation.metrics.failed,
            avg_mrr = ?evaluation.metrics.avg_mrr,
            hallucination_rate = ?evaluation.metrics.hallucination_rate,
            "test set evaluated"
        );
        evaluation
    }

    /// Evaluate a test set and stamp the result with an id and time.
    pub async fn run(&self, test_set_name: &str, cases: &[TestCase]) -> EvaluationRun {
        let evaluation = self.evaluate_test_set(cases).await;
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        EvaluationRun {
            id,
            test_set_name: test_set_name.to_string(),
            run_at: Utc::now(),
            evaluation,
        }
    }
}
