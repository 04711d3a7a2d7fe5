//! Context assembly.
//!
//! Turns ranked search hits into the single grounding string handed to the
//! answer provider.

use via_index::SearchHit;

/// Context passed to the provider when retrieval found nothing. Prompts tell
/// the model to admit a knowledge gap when it sees this.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant information found in the policy documents.";

/// Join the text of the first `max_chunks` hits, numbered from 1 in rank
/// order. Returns [`NO_CONTEXT_SENTINEL`] when there is nothing to join.
pub fn assemble(hits: &[SearchHit], max_chunks: usize) -> String {
    let parts: Vec<String> = hits
        .iter()
        .take(max_chunks)
        .enumerate()
        .map(|(i, hit)| format!("Context {}:\n{}\n", i + 1, hit.chunk.text))
        .collect();

    if parts.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use via_index::Chunk;

    fn hit(text: &str, distance: f32) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id: format!("doc#{}", text.len()),
                source_document_id: "doc".to_string(),
                page_number: None,
                char_start: 0,
                char_end: text.chars().count(),
                text: text.to_string(),
                embedding: None,
            },
            distance,
        }
    }

    #[test]
    fn test_empty_hits_yield_sentinel() {
        assert_eq!(assemble(&[], 3), NO_CONTEXT_SENTINEL);
    }

    #[test]
    fn test_zero_max_chunks_yields_sentinel() {
        assert_eq!(assemble(&[hit("a", 0.1)], 0), NO_CONTEXT_SENTINEL);
    }

    #[test]
    fn test_numbered_in_rank_order() {
        let hits = vec![hit("Deductible is 500.", 0.1), hit("Flood is excluded.", 0.4)];
        assert_eq!(
            assemble(&hits, 3),
            "Context 1:\nDeductible is 500.\n\nContext 2:\nFlood is excluded.\n"
        );
    }

    #[test]
    fn test_truncates_to_max_chunks() {
        let hits = vec![hit("one", 0.1), hit("two", 0.2), hit("three", 0.3)];
        let context = assemble(&hits, 2);
        assert!(context.contains("Context 2:\ntwo"));
        assert!(!context.contains("three"));
    }
}
