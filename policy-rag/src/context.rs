//! Prompt context assembly.
//!
//! Every chunk is rendered as a labeled block and blocks are joined with
//! [`CONTEXT_SEPARATOR`]. The same separator is used by the pipeline and by
//! [`Retriever::get_context_for_llm`](crate::Retriever::get_context_for_llm).

use crate::document::Chunk;

/// Separator placed between context blocks.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Returned by the context helper when retrieval finds nothing.
pub const NO_CONTEXT_FOUND: &str = "No relevant policy documents found for this query.";

/// Render chunks as `[Context i] Source: <source> | Section: <section>\n<text>`
/// blocks, numbered from 1 in retrieval order.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Context {}] Source: {} | Section: {}\n{}",
                i + 1,
                chunk.metadata.source_name(),
                chunk.metadata.section_name(),
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    #[test]
    fn renders_numbered_blocks_with_provenance() {
        let chunks = vec![
            Chunk::new(
                "a",
                "Minimum score is 580.",
                ChunkMetadata::new("credit_scoring_manual.md", "FHA Loans"),
                0.9,
            ),
            Chunk::new("b", "Reserves: 6 months.", ChunkMetadata::default(), 0.8),
        ];

        let context = format_context(&chunks);
        assert_eq!(
            context,
            "[Context 1] Source: credit_scoring_manual.md | Section: FHA Loans\nMinimum score is 580.\
             \n\n---\n\n\
             [Context 2] Source: Unknown | Section: General\nReserves: 6 months."
        );
    }

    #[test]
    fn empty_input_renders_empty_string() {
        assert_eq!(format_context(&[]), "");
    }
}
