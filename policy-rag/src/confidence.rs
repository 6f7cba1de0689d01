//! Confidence scoring for assembled answers.

use serde::{Deserialize, Serialize};

use crate::document::Chunk;

/// Highest score the retrieval heuristic may report.
pub const HEURISTIC_CONFIDENCE_CAP: u8 = 95;

/// Where a response's confidence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceStrategy {
    /// Derived from similarity statistics by [`estimate_confidence`].
    RetrievalHeuristic,
    /// Taken from the validator's judgment.
    LlmValidation,
}

impl ConfidenceStrategy {
    /// Select the strategy for the `validate_answer` flag.
    pub fn for_validation(validate: bool) -> Self {
        if validate { Self::LlmValidation } else { Self::RetrievalHeuristic }
    }
}

/// Map retrieval similarity to a 0–95 confidence score.
///
/// The first chunk is treated as the best match. A top similarity above 0.85
/// lands in 90–95, above 0.75 in 75–90, and anything weaker scales the mean
/// similarity by 75. Returns 0 for an empty slice.
pub fn estimate_confidence(chunks: &[Chunk]) -> u8 {
    let Some(first) = chunks.first() else {
        return 0;
    };

    let top = f64::from(first.similarity);
    let avg = chunks.iter().map(|c| f64::from(c.similarity)).sum::<f64>() / chunks.len() as f64;

    let raw = if top > 0.85 {
        90.0 + ((top - 0.85) * 100.0 / 3.0).floor()
    } else if top > 0.75 {
        75.0 + ((top - 0.75) * 150.0).floor()
    } else {
        (avg * 75.0).floor()
    };

    raw.clamp(0.0, f64::from(HEURISTIC_CONFIDENCE_CAP)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn chunks(similarities: &[f32]) -> Vec<Chunk> {
        similarities
            .iter()
            .enumerate()
            .map(|(i, s)| Chunk::new(i.to_string(), "text", ChunkMetadata::default(), *s))
            .collect()
    }

    #[test]
    fn strong_top_match_lands_in_upper_band() {
        assert_eq!(estimate_confidence(&chunks(&[0.95, 0.5])), 93);
        assert_eq!(estimate_confidence(&chunks(&[1.0])), 95);
    }

    #[test]
    fn middle_band_scales_top_similarity() {
        assert_eq!(estimate_confidence(&chunks(&[0.8, 0.2])), 82);
    }

    #[test]
    fn weak_matches_use_the_mean() {
        assert_eq!(estimate_confidence(&chunks(&[0.6, 0.4])), 37);
    }

    #[test]
    fn empty_retrieval_scores_zero() {
        assert_eq!(estimate_confidence(&[]), 0);
    }

    #[test]
    fn strategy_follows_validation_flag() {
        assert_eq!(ConfidenceStrategy::for_validation(true), ConfidenceStrategy::LlmValidation);
        assert_eq!(
            ConfidenceStrategy::for_validation(false),
            ConfidenceStrategy::RetrievalHeuristic
        );
    }
}
