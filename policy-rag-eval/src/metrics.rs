//! Ranking metrics over retrieved source documents.
//!
//! Relevance is binary: a retrieved document is a hit when its name is in
//! the expected set. All metrics are 0 when the expected set is empty; the
//! evaluator treats such cases as "not applicable" and leaves them out of
//! its averages.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Remove repeated document names, keeping the first occurrence.
///
/// Several chunks of one document usually come back for a question; ranking
/// metrics are computed over documents, not chunks.
pub fn dedup_sources<S: AsRef<str>>(retrieved: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    retrieved
        .iter()
        .map(AsRef::as_ref)
        .filter(|doc| seen.insert(*doc))
        .map(str::to_string)
        .collect()
}

fn hits_within(retrieved: &[String], expected: &HashSet<&str>, k: usize) -> usize {
    retrieved.iter().take(k).filter(|doc| expected.contains(doc.as_str())).count()
}

/// Hits within the top `k` divided by `min(k, retrieved.len())`.
pub fn precision_at_k(retrieved: &[String], expected: &HashSet<&str>, k: usize) -> f64 {
    let denominator = k.min(retrieved.len());
    if expected.is_empty() || denominator == 0 {
        return 0.0;
    }
    hits_within(retrieved, expected, k) as f64 / denominator as f64
}

/// Hits within the top `k` divided by the size of the expected set.
pub fn recall_at_k(retrieved: &[String], expected: &HashSet<&str>, k: usize) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    hits_within(retrieved, expected, k) as f64 / expected.len() as f64
}

/// `1 / rank` of the first hit (1-based), or 0 without a hit.
pub fn reciprocal_rank(retrieved: &[String], expected: &HashSet<&str>) -> f64 {
    retrieved
        .iter()
        .position(|doc| expected.contains(doc.as_str()))
        .map_or(0.0, |idx| 1.0 / (idx + 1) as f64)
}

/// Binary-relevance NDCG at `k`.
///
/// ```text
/// DCG@k  = Σ 1 / log2(i + 2)   over hits at 0-based position i < k
/// IDCG@k = Σ 1 / log2(i + 2)   for i < min(|expected|, k)
/// ```
pub fn ndcg_at_k(retrieved: &[String], expected: &HashSet<&str>, k: usize) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let dcg: f64 = retrieved
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, doc)| expected.contains(doc.as_str()))
        .map(|(i, _)| discount(i))
        .sum();
    let idcg: f64 = (0..expected.len().min(k)).map(discount).sum();
    if idcg == 0.0 { 0.0 } else { dcg / idcg }
}

#[inline]
fn discount(position: usize) -> f64 {
    1.0 / ((position + 2) as f64).log2()
}

/// The ranking metrics reported per test case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingMetrics {
    pub precision_at_1: f64,
    pub precision_at_3: f64,
    pub precision_at_5: f64,
    pub recall_at_5: f64,
    pub mrr: f64,
    pub ndcg_at_5: f64,
}

impl RankingMetrics {
    /// Compute every metric for one case.
    ///
    /// `retrieved` is de-duplicated first. Returns `None` when `expected` is
    /// empty, since the metrics do not apply.
    pub fn compute<S: AsRef<str>, T: AsRef<str>>(retrieved: &[S], expected: &[T]) -> Option<Self> {
        let expected: HashSet<&str> = expected.iter().map(AsRef::as_ref).collect();
        if expected.is_empty() {
            return None;
        }
        let retrieved = dedup_sources(retrieved);

        Some(Self {
            precision_at_1: precision_at_k(&retrieved, &expected, 1),
            precision_at_3: precision_at_k(&retrieved, &expected, 3),
            precision_at_5: precision_at_k(&retrieved, &expected, 5),
            recall_at_5: recall_at_k(&retrieved, &expected, 5),
            mrr: reciprocal_rank(&retrieved, &expected),
            ndcg_at_5: ndcg_at_k(&retrieved, &expected, 5),
        })
    }
}
