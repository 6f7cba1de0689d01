//! Property tests for reranking, MMR selection and confidence estimation.

use std::collections::HashSet;

use policy_rag::confidence::{HEURISTIC_CONFIDENCE_CAP, estimate_confidence};
use policy_rag::document::{Chunk, ChunkMetadata};
use policy_rag::mmr::select_mmr;
use policy_rag::reranker::PolicySignalReranker;
use proptest::prelude::*;

const WORDS: &[&str] = &[
    "credit", "score", "fha", "dti", "reserves", "bankruptcy", "income", "loan", "down", "payment",
];

fn arb_text() -> impl Strategy<Value = String> {
    (
        proptest::collection::vec(proptest::sample::select(WORDS), 1..8),
        proptest::collection::vec(300u32..850, 0..3),
    )
        .prop_map(|(words, numbers)| {
            let mut parts: Vec<String> = words.into_iter().map(str::to_string).collect();
            parts.extend(numbers.into_iter().map(|n| n.to_string()));
            parts.join(" ")
        })
}

fn arb_chunks(max: usize) -> impl Strategy<Value = Vec<Chunk>> {
    proptest::collection::vec((arb_text(), 0.0f32..=1.0), 0..max).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (text, similarity))| {
                Chunk::new(format!("c{i}"), text, ChunkMetadata::new("policy.md", "Credit Score"), similarity)
            })
            .collect()
    })
}

mod prop_rerank {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A shared number never lowers a chunk's adjusted score.
        #[test]
        fn shared_numbers_never_lower_the_score(
            text in arb_text(),
            similarity in 0.0f32..=1.0,
            number in 100u32..999,
        ) {
            let reranker = PolicySignalReranker::default();
            let chunk = Chunk::new(
                "c",
                format!("{text} {number}"),
                ChunkMetadata::new("policy.md", "Requirements"),
                similarity,
            );

            let without = reranker.score("what is required", &chunk);
            let with = reranker.score(&format!("what is required {number}"), &chunk);
            prop_assert!(with >= without);
            prop_assert!(with <= 1.0);
            prop_assert!(without >= similarity.min(1.0) - f32::EPSILON);
        }

        #[test]
        fn rerank_is_a_sorted_permutation(chunks in arb_chunks(12), query in arb_text()) {
            let reranker = PolicySignalReranker::default();
            let ids: HashSet<String> = chunks.iter().map(|c| c.id.clone()).collect();

            let ranked = reranker.rerank_sync(&query, chunks);
            let ranked_ids: HashSet<String> = ranked.iter().map(|c| c.id.clone()).collect();
            prop_assert_eq!(ids, ranked_ids);

            for pair in ranked.windows(2) {
                prop_assert!(pair[0].effective_score() >= pair[1].effective_score());
            }
        }
    }
}

mod prop_mmr {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn selection_has_no_duplicates_and_leads_with_best(
            chunks in arb_chunks(15),
            top_k in 1usize..8,
            weight in 0.0f32..=1.0,
        ) {
            let best = chunks
                .iter()
                .map(|c| c.similarity)
                .fold(f32::NEG_INFINITY, f32::max);
            let total = chunks.len();

            let selected = select_mmr(chunks, top_k, weight);
            prop_assert_eq!(selected.len(), top_k.min(total));

            let unique: HashSet<&str> = selected.iter().map(|c| c.id.as_str()).collect();
            prop_assert_eq!(unique.len(), selected.len());

            if let Some(first) = selected.first() {
                prop_assert_eq!(first.similarity, best);
            }
        }
    }
}

mod prop_confidence {
    use super::*;

    fn ranked(top: f32, rest: &[f32]) -> Vec<Chunk> {
        std::iter::once(top)
            .chain(rest.iter().map(|s| s.min(top)))
            .enumerate()
            .map(|(i, s)| Chunk::new(format!("c{i}"), "text", ChunkMetadata::default(), s))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn confidence_is_monotone_and_capped(
            a in 0.0f32..=1.0,
            b in 0.0f32..=1.0,
            rest in proptest::collection::vec(0.0f32..=1.0, 0..6),
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            // Lower-ranked chunks are capped at the low top so both lists share them.
            let shared: Vec<f32> = rest.iter().map(|s| s.min(low)).collect();

            let c_low = estimate_confidence(&ranked(low, &shared));
            let c_high = estimate_confidence(&ranked(high, &shared));
            prop_assert!(c_low <= c_high, "{low} -> {c_low}, {high} -> {c_high}");
            prop_assert!(c_high <= HEURISTIC_CONFIDENCE_CAP);
        }
    }
}
