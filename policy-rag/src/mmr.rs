//! Maximal marginal relevance selection.

use crate::document::Chunk;
use crate::text::jaccard_similarity;

/// Greedily pick up to `top_k` chunks balancing relevance and redundancy.
///
/// The most similar candidate is always taken first. Each following pick
/// maximizes `(1 - w) * similarity - w * max_overlap`, where `max_overlap` is
/// the highest word-overlap Jaccard between the candidate and any chunk
/// already selected. Ties go to the candidate seen first.
pub fn select_mmr(candidates: Vec<Chunk>, top_k: usize, diversity_weight: f32) -> Vec<Chunk> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut remaining = candidates;
    let first = remaining
        .iter()
        .enumerate()
        .fold(0, |best, (idx, c)| if c.similarity > remaining[best].similarity { idx } else { best });
    let mut selected = vec![remaining.remove(first)];

    while selected.len() < top_k && !remaining.is_empty() {
        let mut best_score = f32::NEG_INFINITY;
        let mut best_idx = 0;

        for (idx, candidate) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|s| jaccard_similarity(&candidate.text, &s.text))
                .fold(0.0_f32, f32::max);
            let score = (1.0 - diversity_weight) * candidate.similarity
                - diversity_weight * redundancy;
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        selected.push(remaining.remove(best_idx));
    }

    selected
}
