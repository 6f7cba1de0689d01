//! Pure text signals shared by reranking, diversity selection and evaluation.
//!
//! Tokenization is pinned to Unicode whitespace splitting after lowercasing,
//! so scores are reproducible across platforms and locales.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static INTEGER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

static DECIMAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid decimal pattern"));

/// Lowercased whitespace tokens, in order, duplicates kept.
pub fn query_terms(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Distinct lowercased whitespace tokens.
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Word-overlap Jaccard similarity of two texts.
///
/// Returns 0.0 when either text has no tokens.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f32 / union as f32
}

/// Distinct runs of ASCII digits, e.g. `"620 or 620+ and 43%"` → `{"620", "43"}`.
pub fn integer_tokens(text: &str) -> HashSet<String> {
    INTEGER_TOKEN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Distinct numbers including a decimal part, e.g. `"3.5%"` → `{"3.5"}`.
pub fn numeric_tokens(text: &str) -> HashSet<String> {
    DECIMAL_TOKEN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Count of distinct integer tokens present in both texts.
pub fn shared_integer_count(a: &str, b: &str) -> usize {
    let left = integer_tokens(a);
    let right = integer_tokens(b);
    left.intersection(&right).count()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
