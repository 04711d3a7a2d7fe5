use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::error::ProviderError;
use crate::llm::failover::FailoverError;
use crate::rag::chunker::ChunkError;

// ============= Document Types =============

/// Plain text of a document as delivered by a text extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Identifier of the document (usually its file name).
    pub source_id: String,
    /// Full extracted text.
    pub text: String,
    /// Character offset at which each page starts, ascending. Empty when the
    /// extractor reported no pages.
    pub page_starts: Vec<usize>,
}

impl ExtractedDocument {
    /// Page separator used when joining pages into one text.
    pub const PAGE_SEPARATOR: &'static str = "\n\n";

    /// A document without page metadata.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            page_starts: Vec::new(),
        }
    }

    /// Join page texts with a blank line, recording where each page starts.
    pub fn from_pages<I, S>(source_id: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let separator_chars = Self::PAGE_SEPARATOR.chars().count();
        let mut text = String::new();
        let mut page_starts = Vec::new();
        let mut offset = 0usize;

        for (i, page) in pages.into_iter().enumerate() {
            if i > 0 {
                text.push_str(Self::PAGE_SEPARATOR);
                offset += separator_chars;
            }
            page_starts.push(offset);
            let page = page.as_ref();
            text.push_str(page);
            offset += page.chars().count();
        }

        Self {
            source_id: source_id.into(),
            text,
            page_starts,
        }
    }

    /// Number of pages, zero when unknown.
    pub fn page_count(&self) -> usize {
        self.page_starts.len()
    }
}

// ============= Query Types =============

/// Answer produced for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Generated answer text.
    pub response_text: String,
    /// Configured name of the provider that answered.
    pub provider_id: String,
    /// Model that produced the answer.
    pub model_id: String,
}

/// One answered question in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The user's question.
    pub query: String,
    /// The generated answer.
    pub response: String,
    /// Provider that answered.
    pub provider_id: String,
    /// Model that answered.
    pub model_id: String,
    /// When the answer was returned.
    pub timestamp: DateTime<Utc>,
}

// ============= Error Types =============

/// Failures of [`RagOrchestrator::ingest_document`](crate::rag::RagOrchestrator::ingest_document).
///
/// Every variant leaves the index exactly as it was before the call.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document could not be chunked (no content, bad settings).
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// Chunks from this source are already indexed.
    #[error("Document '{0}' is already indexed")]
    AlreadyIndexed(String),

    /// The embedding provider failed.
    #[error("Embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    /// The embedding provider returned a different number of vectors than
    /// chunks sent.
    #[error("Embedding provider returned {actual} vectors for {expected} chunks")]
    EmbeddingCount {
        /// Chunks sent.
        expected: usize,
        /// Vectors received.
        actual: usize,
    },

    /// Insert or persist was rejected by the index.
    #[error("Index error: {0}")]
    Index(#[from] via_index::Error),
}

/// Failures of [`RagOrchestrator::answer_query`](crate::rag::RagOrchestrator::answer_query).
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query is empty or whitespace.
    #[error("Query is empty")]
    EmptyQuery,

    /// No index has been built yet. Distinct from an index with no
    /// relevant matches, which still produces an answer.
    #[error("No documents have been indexed yet")]
    NoIndex,

    /// The query could not be embedded.
    #[error("Embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    /// Search was rejected by the index.
    #[error("Index error: {0}")]
    Index(#[from] via_index::Error),

    /// Generation failed after failover.
    #[error(transparent)]
    Generation(#[from] FailoverError),
}

impl QueryError {
    /// Whether the failure means "try again later" rather than a bad
    /// request or a broken index.
    pub fn is_temporarily_unavailable(&self) -> bool {
        matches!(
            self,
            QueryError::Generation(
                FailoverError::Unavailable | FailoverError::ProviderFailed { .. }
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pages_records_page_starts() {
        let doc = ExtractedDocument::from_pages("policy.pdf", ["Seite eins", "Page two", ""]);
        assert_eq!(doc.text, "Seite eins\n\nPage two\n\n");
        assert_eq!(doc.page_starts, vec![0, 12, 22]);
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_page_starts_count_chars_not_bytes() {
        let doc = ExtractedDocument::from_pages("d", ["Prämie", "x"]);
        assert_eq!(doc.page_starts, vec![0, 8]);
        let second: String = doc.text.chars().skip(8).collect();
        assert_eq!(second, "x");
    }

    #[test]
    fn test_new_has_no_pages() {
        let doc = ExtractedDocument::new("d", "text");
        assert_eq!(doc.page_count(), 0);
    }
}
