//! Plain-text evaluation reports.

use std::fmt::Write;

use crate::evaluator::{CaseResult, EvaluationRun};
use crate::probes::ProbeEvaluation;

const RULE_WIDTH: usize = 70;

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0))
}

fn num(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.decimals$}"))
}

fn case_block(out: &mut String, index: usize, result: &CaseResult) {
    let label = result.case_id.clone().unwrap_or_else(|| index.to_string());
    if !result.success {
        let _ = writeln!(out, "Test Case {label}: FAILED");
        let _ = writeln!(out, "  Question: {}", result.question);
        let _ = writeln!(out, "  Error: {}", result.error.as_deref().unwrap_or("Unknown"));
        out.push('\n');
        return;
    }

    let _ = writeln!(out, "Test Case {label}:");
    let _ = writeln!(out, "  Question: {}", result.question);
    let _ = writeln!(out, "  Confidence: {}%", result.confidence);
    let _ = writeln!(out, "  Sources: {}", result.sources.join(", "));
    if !result.expected_sources.is_empty() {
        let _ = writeln!(out, "  Expected: {}", result.expected_sources.join(", "));
    }
    if let Some(matched) = result.source_match {
        let _ = writeln!(out, "  Source match: {}", if matched { "yes" } else { "no" });
    }
    if let Some(ranking) = &result.ranking {
        let _ = writeln!(
            out,
            "  P@1 {:.2}  P@3 {:.2}  R@5 {:.2}  MRR {:.2}  NDCG@5 {:.2}",
            ranking.precision_at_1,
            ranking.precision_at_3,
            ranking.recall_at_5,
            ranking.mrr,
            ranking.ndcg_at_5
        );
    }
    let grounded = match result.grounded {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    };
    let _ = writeln!(out, "  Grounded: {grounded}");
    if result.has_hallucination {
        let _ = writeln!(out, "  Unsupported numbers in answer");
    }
    if let Some(relevancy) = result.answer_relevancy {
        let _ = writeln!(out, "  Relevancy: {relevancy}");
    }
    if let Some(correct) = result.answer_correct {
        let _ = writeln!(out, "  Answer correct: {correct}");
    }
    let _ = writeln!(out, "  Response Time: {:.2}s", result.response_time);
    out.push('\n');
}

/// Render a test-set run as a fixed-width text report.
pub fn render_report(run: &EvaluationRun) -> String {
    let metrics = &run.evaluation.metrics;
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{heavy}\nPOLICY QA EVALUATION REPORT\n{heavy}\n");
    let _ = writeln!(out, "Run: {} ({})", run.id, run.test_set_name);
    let _ = writeln!(out, "At: {}\n", run.run_at.format("%Y-%m-%d %H:%M:%S UTC"));

    let _ = writeln!(out, "Total Test Cases: {}", metrics.total_tests);
    let _ = writeln!(out, "Successful: {}", metrics.successful);
    let _ = writeln!(out, "Failed: {}", metrics.failed);
    let _ = writeln!(out, "Success Rate: {}\n", pct(Some(metrics.success_rate)));

    let _ = writeln!(out, "PERFORMANCE METRICS:\n{light}");
    let _ = writeln!(out, "Average Confidence: {}%", num(metrics.avg_confidence, 1));
    let _ = writeln!(out, "High Confidence Rate (>=80%): {}", pct(metrics.high_confidence_rate));
    let _ = writeln!(out, "Average Response Time: {} seconds", num(metrics.avg_response_time, 2));
    let _ = writeln!(out, "Average Sources Retrieved: {}", num(metrics.avg_sources_retrieved, 1));
    let _ = writeln!(out, "Source Accuracy: {}", pct(metrics.source_accuracy));
    let _ = writeln!(out, "Citation Coverage: {}\n", pct(metrics.citation_coverage));

    let _ = writeln!(out, "RANKING METRICS ({} cases with expected sources):\n{light}", metrics.ranked_cases);
    let _ = writeln!(out, "Precision@1: {}", num(metrics.avg_precision_at_1, 3));
    let _ = writeln!(out, "Precision@3: {}", num(metrics.avg_precision_at_3, 3));
    let _ = writeln!(out, "Precision@5: {}", num(metrics.avg_precision_at_5, 3));
    let _ = writeln!(out, "Recall@5: {}", num(metrics.avg_recall_at_5, 3));
    let _ = writeln!(out, "MRR: {}", num(metrics.avg_mrr, 3));
    let _ = writeln!(out, "NDCG@5: {}\n", num(metrics.avg_ndcg_at_5, 3));

    let _ = writeln!(out, "FAITHFULNESS:\n{light}");
    let _ = writeln!(out, "Grounded Rate: {}", pct(metrics.faithfulness_grounded_rate));
    let _ = writeln!(out, "Hallucination Rate: {}", pct(metrics.hallucination_rate));
    let _ = writeln!(out, "Average Validator Confidence: {}", num(metrics.avg_faithfulness_confidence, 1));
    let _ = writeln!(out, "Average Answer Relevancy: {}", num(metrics.avg_answer_relevancy, 1));
    let _ = writeln!(out, "Answer Accuracy: {}\n", pct(metrics.answer_accuracy));

    let failed_cases = &run.evaluation.failed_cases;
    if failed_cases.is_empty() {
        let _ = writeln!(out, "Failed Cases: none\n");
    } else {
        let _ = writeln!(out, "Failed Cases: {}\n", failed_cases.join(", "));
    }

    let _ = writeln!(out, "DETAILED RESULTS:\n{light}\n");
    for (i, result) in run.evaluation.results.iter().enumerate() {
        case_block(&mut out, i + 1, result);
    }
    out
}

/// Render a short probe summary.
pub fn render_probe_summary(evaluation: &ProbeEvaluation) -> String {
    let s = &evaluation.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Probes: {} ({} errors)", s.total, s.errors);
    let _ = writeln!(out, "Hit Rate: {}", pct(s.hit_rate));
    let _ = writeln!(out, "Grounded Rate: {}", pct(s.grounded_rate));
    let _ = writeln!(out, "Average Top Similarity: {}", num(s.avg_top_similarity, 3));
    let _ = writeln!(out, "Average Mean Similarity: {}", num(s.avg_mean_similarity, 3));
    let _ = writeln!(out, "Numeric Fidelity: {}", pct(s.avg_numeric_fidelity));
    let _ = writeln!(
        out,
        "Refusal Rate ({} unanswerable): {}",
        s.unanswerable_count,
        pct(s.refusal_rate)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{Coverage, TestSetEvaluation};
    use chrono::Utc;

    fn run(results: Vec<CaseResult>) -> EvaluationRun {
        EvaluationRun {
            id: "abcd1234".into(),
            test_set_name: "sample".into(),
            run_at: Utc::now(),
            evaluation: TestSetEvaluation::from_results(results, Coverage::default()),
        }
    }

    #[test]
    fn report_lists_failures_and_missing_metrics() {
        let failed = CaseResult {
            case_id: Some("tc_009".into()),
            question: "What is the LTV cap?".into(),
            category: None,
            success: false,
            answer: String::new(),
            confidence: 0,
            retrieved_count: 0,
            response_time: 0.1,
            sources: Vec::new(),
            expected_sources: Vec::new(),
            source_match: None,
            ranking: None,
            has_hallucination: false,
            grounded: None,
            faithfulness_confidence: None,
            answer_relevancy: None,
            answer_correct: None,
            error: Some("Retrieval error: index offline".into()),
        };

        let report = render_report(&run(vec![failed]));
        assert!(report.contains("Run: abcd1234 (sample)"));
        assert!(report.contains("Test Case tc_009: FAILED"));
        assert!(report.contains("Error: Retrieval error: index offline"));
        assert!(report.contains("MRR: n/a"));
        assert!(report.contains("Success Rate: 0.0%"));
        assert!(report.contains("Failed Cases: tc_009"));
        assert!(report.contains("Hallucination Rate: n/a"));
    }

    #[test]
    fn report_shows_source_match_and_hallucination() {
        let answered = CaseResult {
            case_id: Some("tc_001".into()),
            question: "Minimum FHA score?".into(),
            category: None,
            success: true,
            answer: "The minimum is 620.".into(),
            confidence: 85,
            retrieved_count: 1,
            response_time: 0.4,
            sources: vec!["credit_scoring_manual.md".into()],
            expected_sources: vec!["credit_scoring_manual.md".into()],
            source_match: Some(true),
            ranking: None,
            has_hallucination: true,
            grounded: Some(true),
            faithfulness_confidence: Some(85),
            answer_relevancy: None,
            answer_correct: None,
            error: None,
        };

        let report = render_report(&run(vec![answered]));
        assert!(report.contains("Source Accuracy: 100.0%"));
        assert!(report.contains("Citation Coverage: 100.0%"));
        assert!(report.contains("Hallucination Rate: 100.0%"));
        assert!(report.contains("  Source match: yes"));
        assert!(report.contains("  Unsupported numbers in answer"));
        assert!(report.contains("Failed Cases: none"));
    }
}
