//! Pre-chunked corpus loading.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use policy_rag::IndexedChunk;

/// Read a JSON array of `{id, text, metadata}` chunks.
///
/// Rejects duplicate ids and chunks with blank text.
pub fn load_corpus(path: &Path) -> Result<Vec<IndexedChunk>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus {}", path.display()))?;
    let chunks: Vec<IndexedChunk> = serde_json::from_str(&raw)
        .with_context(|| format!("corpus {} is not a JSON array of chunks", path.display()))?;

    let mut ids = HashSet::new();
    for chunk in &chunks {
        if chunk.text.trim().is_empty() {
            bail!("chunk '{}' has no text", chunk.id);
        }
        if !ids.insert(chunk.id.as_str()) {
            bail!("duplicate chunk id '{}'", chunk.id);
        }
    }
    Ok(chunks)
}
