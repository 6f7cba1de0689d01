//! # policy-rag-eval
//!
//! Retrieval-quality and groundedness evaluation for [`policy_rag`].
//!
//! - [`Evaluator::evaluate_test_set`] runs labeled [`TestCase`]s through the
//!   pipeline with validation on, and reports precision@1/3/5, recall@5,
//!   MRR and NDCG@5 over expected source documents, plus source accuracy,
//!   citation coverage, grounded rate, validator confidence, numeric
//!   hallucination rate, LLM-judged relevancy and answer accuracy.
//! - [`Evaluator::evaluate_unlabeled_probes`] runs [`Probe`]s without ground
//!   truth and reports hit rate, grounded rate, similarity statistics,
//!   numeric fidelity and refusal rate on unanswerable questions.
//! - [`render_report`] formats a run as plain text.
//!
//! ```rust,ignore
//! use policy_rag_eval::{Evaluator, render_report, sample_test_cases};
//!
//! let evaluator = Evaluator::new(pipeline).with_concurrency(4);
//! let run = evaluator.run("sample", &sample_test_cases()).await;
//! println!("{}", render_report(&run));
//! ```

pub mod case;
pub mod error;
pub mod evaluator;
pub mod hallucination;
pub mod judge;
pub mod metrics;
pub mod probes;
pub mod report;

pub use case::{Difficulty, QuestionCategory, TestCase, answer_is_correct, parse_test_set, sample_test_cases};
pub use error::{EvalError, Result};
pub use evaluator::{
    CaseResult, Coverage, EvaluationMetrics, EvaluationRun, Evaluator, TestSetEvaluation,
};
pub use hallucination::{has_numeric_hallucination, unsupported_numbers};
pub use judge::{RelevancyJudge, parse_relevancy};
pub use metrics::{RankingMetrics, dedup_sources, ndcg_at_k, precision_at_k, recall_at_k, reciprocal_rank};
pub use probes::{
    Probe, ProbeEvaluation, ProbeResult, ProbeSummary, is_refusal, numeric_fidelity, parse_probes,
};
pub use report::{render_probe_summary, render_report};
