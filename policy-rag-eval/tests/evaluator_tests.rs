//! Evaluator runs over scripted retrieval and completion services.

use std::sync::Arc;

use policy_rag::mock::{MockCompletionService, StaticSearchGateway};
use policy_rag::{Chunk, ChunkMetadata, RagPipeline};
use policy_rag_eval::{
    Evaluator, Probe, RelevancyJudge, TestCase, render_report, sample_test_cases,
};

fn chunk(id: &str, source: &str, section: &str, text: &str, similarity: f32) -> Chunk {
    Chunk::new(id, text, ChunkMetadata::new(source, section), similarity)
}

fn fha_corpus() -> Vec<Chunk> {
    vec![
        chunk(
            "a",
            "risk_assessment_guidelines.md",
            "Credit Score Overview",
            "General risk tiers.",
            0.88,
        ),
        chunk(
            "b",
            "credit_scoring_manual.md",
            "FHA Loans",
            "FHA minimum credit score is 580 with 3.5% down.",
            0.86,
        ),
        chunk("c", "credit_scoring_manual.md", "FHA Loans", "Scores 500-579 need 10% down.", 0.8),
    ]
}

fn pipeline(chunks: Vec<Chunk>, service: MockCompletionService) -> Arc<RagPipeline> {
    Arc::new(
        RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::new(chunks)))
            .completion_service(Arc::new(service))
            .build()
            .unwrap(),
    )
}

fn judge(reply: &str) -> RelevancyJudge {
    RelevancyJudge::new(Arc::new(MockCompletionService::new(reply)), 256)
}

#[tokio::test]
async fn labeled_case_gets_ranking_faithfulness_and_relevancy() {
    let service = MockCompletionService::new(r#"{"grounded": "Yes", "confidence": 88}"#)
        .queue_reply("The FHA minimum is 580 (Source: credit_scoring_manual.md - FHA Loans)");
    let evaluator =
        Evaluator::new(pipeline(fha_corpus(), service)).with_judge(judge(r#"{"relevancy": 92}"#));

    let case = sample_test_cases().remove(0);
    let result = evaluator.evaluate_case(&case).await;

    assert!(result.success);
    assert_eq!(result.case_id.as_deref(), Some("tc_001"));
    assert_eq!(result.sources, vec!["risk_assessment_guidelines.md", "credit_scoring_manual.md"]);
    let ranking = result.ranking.unwrap();
    assert_eq!(ranking.precision_at_1, 0.0);
    assert_eq!(ranking.mrr, 0.5);
    assert_eq!(result.grounded, Some(true));
    assert_eq!(result.faithfulness_confidence, Some(88));
    assert_eq!(result.confidence, 88);
    assert_eq!(result.answer_relevancy, Some(92));
    assert_eq!(result.answer_correct, Some(true));
    assert_eq!(result.source_match, Some(true));
    assert!(!result.has_hallucination);
}

#[tokio::test]
async fn numbers_missing_from_retrieved_text_are_flagged() {
    let service = MockCompletionService::new(r#"{"grounded": "No", "confidence": 40}"#)
        .queue_reply("The FHA minimum is 620 (Source: credit_scoring_manual.md - FHA Loans)");
    let evaluator = Evaluator::new(pipeline(fha_corpus(), service)).without_relevancy();

    let case = TestCase::new("tc_h", "What is the FHA minimum credit score?")
        .with_expected_sources(["underwriting_policies.md"]);
    let evaluation = evaluator.evaluate_test_set(&[case]).await;

    let result = &evaluation.results[0];
    assert!(result.has_hallucination);
    assert_eq!(result.source_match, Some(false));
    assert_eq!(evaluation.metrics.hallucination_rate, Some(1.0));
    assert_eq!(evaluation.metrics.source_accuracy, Some(0.0));
    assert_eq!(evaluation.metrics.citation_coverage, Some(1.0));
    assert!(evaluation.failed_cases.is_empty());
}

#[tokio::test]
async fn evaluation_always_validates() {
    let service = Arc::new(MockCompletionService::new("GROUNDED: Yes"));
    let pipeline = Arc::new(
        RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::new(fha_corpus())))
            .completion_service(service.clone())
            .build()
            .unwrap(),
    );
    let evaluator = Evaluator::new(pipeline).without_relevancy();

    let result = evaluator.evaluate_query("FHA minimum?", None, &[]).await;
    assert!(result.success);
    assert!(result.ranking.is_none());
    assert_eq!(result.answer_relevancy, None);
    // answer + validation, no judge call
    assert_eq!(service.call_count(), 2);
}

#[tokio::test]
async fn failures_are_recorded_and_the_set_completes() {
    let evaluator = Evaluator::new(Arc::new(
        RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::failing("index offline")))
            .completion_service(Arc::new(MockCompletionService::new("unused")))
            .build()
            .unwrap(),
    ))
    .without_relevancy();

    let evaluation = evaluator.evaluate_test_set(&sample_test_cases()).await;
    assert_eq!(evaluation.results.len(), 5);
    assert_eq!(evaluation.metrics.failed, 5);
    assert_eq!(evaluation.metrics.success_rate, 0.0);
    assert_eq!(evaluation.metrics.avg_mrr, None);
    assert_eq!(evaluation.failed_cases, vec!["tc_001", "tc_002", "tc_003", "tc_004", "tc_005"]);
    assert!(evaluation.results.iter().all(|r| r.error.as_deref().is_some_and(|e| e.contains("index offline"))));
    assert_eq!(evaluation.coverage.total_cases, 5);
}

#[tokio::test]
async fn concurrent_evaluation_preserves_case_order() {
    let evaluator =
        Evaluator::new(pipeline(fha_corpus(), MockCompletionService::new("GROUNDED: Yes")))
            .without_relevancy()
            .with_concurrency(4);

    let run = evaluator.run("sample", &sample_test_cases()).await;
    let ids: Vec<_> = run.evaluation.results.iter().filter_map(|r| r.case_id.clone()).collect();
    assert_eq!(ids, vec!["tc_001", "tc_002", "tc_003", "tc_004", "tc_005"]);
    assert_eq!(run.id.len(), 8);
    assert_eq!(run.evaluation.metrics.ranked_cases, 5);
    assert_eq!(run.evaluation.metrics.faithfulness_grounded_rate, Some(1.0));
    assert_eq!(run.evaluation.metrics.hallucination_rate, Some(0.0));
    assert_eq!(run.evaluation.metrics.citation_coverage, Some(1.0));

    let report = render_report(&run);
    assert!(report.contains("Test Case tc_005:"));
    assert!(report.contains("RANKING METRICS (5 cases with expected sources)"));
}

#[tokio::test]
async fn empty_retrieval_counts_as_success_with_zero_confidence() {
    let evaluator = Evaluator::new(pipeline(Vec::new(), MockCompletionService::new("unused")))
        .with_judge(judge(r#"{"relevancy": 70}"#));

    let case = TestCase::new("edge", "Do you accept crypto as collateral?")
        .with_expected_sources(["underwriting_policies.md"]);
    let result = evaluator.evaluate_case(&case).await;
    assert!(result.success);
    assert_eq!(result.confidence, 0);
    assert_eq!(result.retrieved_count, 0);
    assert_eq!(result.ranking.map(|r| r.recall_at_5), Some(0.0));
    assert_eq!(result.grounded, None);
}

#[tokio::test]
async fn probes_report_hits_fidelity_and_refusals() {
    let service = MockCompletionService::new("GROUNDED: Yes")
        .queue_reply("The minimum score is 580 and 620.");
    let evaluator = Evaluator::new(pipeline(fha_corpus(), service)).without_relevancy();

    let probes = vec![Probe {
        id: "p1".into(),
        question: "FHA minimum credit score?".into(),
        unanswerable: false,
    }];
    let evaluation = evaluator.evaluate_unlabeled_probes(&probes).await;
    let probe = &evaluation.probes[0];
    assert_eq!(probe.retrieved_count, 3);
    assert_eq!(probe.numeric_fidelity, Some(0.5));
    assert_eq!(probe.grounded, Some(true));
    assert!(!probe.refused);
    assert_eq!(evaluation.summary.hit_rate, Some(1.0));
}

#[tokio::test]
async fn unlabeled_fidelity_ignores_context_label_numbers() {
    let corpus = vec![
        chunk("a", "underwriting_policies.md", "Bankruptcy", "Chapter 7 discharge rules.", 0.9),
        chunk("b", "underwriting_policies.md", "Bankruptcy", "Chapter 13 repayment plans.", 0.85),
    ];
    let service = MockCompletionService::new("GROUNDED: Yes")
        .queue_reply("Wait 2 years after Chapter 13 discharge.");
    let evaluator = Evaluator::new(pipeline(corpus, service)).without_relevancy();

    let probes = vec![Probe {
        id: "p2".into(),
        question: "Waiting period after Chapter 13?".into(),
        unanswerable: false,
    }];
    let evaluation = evaluator.evaluate_unlabeled_probes(&probes).await;
    assert_eq!(evaluation.probes[0].numeric_fidelity, Some(0.5));
    assert_eq!(evaluation.summary.avg_numeric_fidelity, Some(0.5));
}

#[tokio::test]
async fn unanswerable_probe_with_no_hits_is_refused_without_generation() {
    let service = Arc::new(MockCompletionService::new("unused"));
    let pipeline = Arc::new(
        RagPipeline::builder()
            .search_gateway(Arc::new(StaticSearchGateway::new(Vec::new())))
            .completion_service(service.clone())
            .build()
            .unwrap(),
    );
    let evaluator = Evaluator::new(pipeline).without_relevancy();

    let probes = vec![Probe {
        id: "u1".into(),
        question: "What is the policy on crypto collateral?".into(),
        unanswerable: true,
    }];
    let evaluation = evaluator.evaluate_unlabeled_probes(&probes).await;
    assert!(evaluation.probes[0].refused);
    assert_eq!(evaluation.summary.refusal_rate, Some(1.0));
    assert_eq!(evaluation.summary.hit_rate, Some(0.0));
    assert_eq!(service.call_count(), 0);
}
