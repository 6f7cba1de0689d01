//! Numeric hallucination check.
//!
//! An answer that states a number the retrieved policy text never mentions
//! is flagged as hallucinated.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static NUMERIC_CLAIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?%?").expect("valid numeric claim pattern"));

fn numeric_claims(text: &str) -> BTreeSet<&str> {
    NUMERIC_CLAIM.find_iter(text).map(|m| m.as_str()).collect()
}

/// Numbers in `answer` (with an optional trailing `%`) that never occur in
/// `source_text`, sorted.
///
/// Single-character tokens such as `2` are ignored; they are usually counts
/// or list positions rather than policy values.
pub fn unsupported_numbers(answer: &str, source_text: &str) -> Vec<String> {
    let available = numeric_claims(source_text);
    numeric_claims(answer)
        .into_iter()
        .filter(|claim| claim.len() > 1 && !available.contains(claim))
        .map(str::to_string)
        .collect()
}

/// Whether `answer` states any multi-character number missing from `source_text`.
pub fn has_numeric_hallucination(answer: &str, source_text: &str) -> bool {
    !unsupported_numbers(answer, source_text).is_empty()
}
