//! Data types for policy chunks, index entries and search results.

use serde::{Deserialize, Serialize};

/// Label used when a chunk carries no source document name.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Label used when a chunk carries no section heading.
pub const GENERAL_SECTION: &str = "General";

/// Provenance of a chunk within the policy corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Source document name, e.g. `credit_scoring_manual.md`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Section heading the chunk was cut from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Policy version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Date the policy became effective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    /// Position of the chunk within its source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ChunkMetadata {
    /// Metadata with a source document and section heading.
    pub fn new(source: impl Into<String>, section: impl Into<String>) -> Self {
        Self { source: Some(source.into()), section: Some(section.into()), ..Self::default() }
    }

    /// Set the policy version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the effective date.
    pub fn with_effective_date(mut self, date: impl Into<String>) -> Self {
        self.effective_date = Some(date.into());
        self
    }

    /// Set the chunk position.
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// The source name, or [`UNKNOWN_SOURCE`].
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }

    /// The section heading, or [`GENERAL_SECTION`].
    pub fn section_name(&self) -> &str {
        self.section.as_deref().unwrap_or(GENERAL_SECTION)
    }
}

/// A retrieved slice of a policy document, scored against one query.
///
/// Chunks are produced fresh by the similarity search gateway for every
/// query and dropped once the response is assembled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Identifier of the indexed chunk.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Provenance metadata.
    pub metadata: ChunkMetadata,
    /// Query similarity in `[0, 1]`.
    pub similarity: f32,
    /// Adjusted score assigned by a reranker, capped at `1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl Chunk {
    /// Create a chunk with a similarity score and no rerank score.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: ChunkMetadata,
        similarity: f32,
    ) -> Self {
        Self { id: id.into(), text: text.into(), metadata, similarity, rerank_score: None }
    }

    /// The rerank score when present, otherwise the similarity.
    pub fn effective_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.similarity)
    }
}

/// A chunk as stored in the vector index, with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until indexed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Provenance metadata.
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl IndexedChunk {
    /// Create an un-embedded index entry.
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { id: id.into(), text: text.into(), embedding: Vec::new(), metadata }
    }
}

/// A stored [`IndexedChunk`] paired with its raw index score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The stored chunk.
    pub chunk: IndexedChunk,
    /// The cosine score (higher is more relevant).
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_provenance_falls_back_to_labels() {
        let metadata = ChunkMetadata::default();
        assert_eq!(metadata.source_name(), "Unknown");
        assert_eq!(metadata.section_name(), "General");
    }

    #[test]
    fn effective_score_prefers_rerank_score() {
        let mut chunk = Chunk::new("c1", "text", ChunkMetadata::default(), 0.72);
        assert_eq!(chunk.effective_score(), 0.72);
        chunk.rerank_score = Some(0.8);
        assert_eq!(chunk.effective_score(), 0.8);
    }

    #[test]
    fn metadata_deserializes_with_optional_fields_absent() {
        let metadata: ChunkMetadata =
            serde_json::from_str(r#"{"source":"underwriting_policies.md"}"#).unwrap();
        assert_eq!(metadata.source_name(), "underwriting_policies.md");
        assert!(metadata.section.is_none());
        assert!(metadata.effective_date.is_none());
    }
}
