//! Property tests for ranking metrics.

use policy_rag_eval::RankingMetrics;
use proptest::prelude::*;

fn arb_docs() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("doc[a-f]\\.md", 0..10)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn metrics_stay_in_unit_interval(retrieved in arb_docs(), expected in arb_docs()) {
        match RankingMetrics::compute(&retrieved, &expected) {
            None => prop_assert!(expected.is_empty()),
            Some(m) => {
                for value in [m.precision_at_1, m.precision_at_3, m.precision_at_5, m.recall_at_5, m.mrr, m.ndcg_at_5] {
                    prop_assert!((0.0..=1.0 + 1e-9).contains(&value), "out of range: {value}");
                }
            }
        }
    }

    #[test]
    fn a_first_place_hit_maxes_mrr_and_precision_at_1(
        expected in proptest::collection::vec("doc[a-f]\\.md", 1..4),
        tail in arb_docs(),
    ) {
        let mut retrieved = vec![expected[0].clone()];
        retrieved.extend(tail);

        let m = RankingMetrics::compute(&retrieved, &expected).unwrap();
        prop_assert_eq!(m.mrr, 1.0);
        prop_assert_eq!(m.precision_at_1, 1.0);
        prop_assert!(m.ndcg_at_5 > 0.0);
    }

    #[test]
    fn no_hits_means_all_zero(retrieved in proptest::collection::vec("other[a-c]\\.md", 0..6)) {
        let m = RankingMetrics::compute(&retrieved, &["doca.md"]).unwrap();
        prop_assert_eq!(m, RankingMetrics {
            precision_at_1: 0.0,
            precision_at_3: 0.0,
            precision_at_5: 0.0,
            recall_at_5: 0.0,
            mrr: 0.0,
            ndcg_at_5: 0.0,
        });
    }
}
