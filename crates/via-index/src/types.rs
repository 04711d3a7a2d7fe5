//! Common types for via-index.

use crate::distance::DistanceMetric;
use serde::{Deserialize, Serialize};

/// Identifier of a chunk inside an index.
pub type ChunkId = String;

/// A bounded span of document text plus its embedding.
///
/// Chunks are produced by the chunker without an embedding, receive one
/// from the embedding provider, and are immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier (`<source>#<ordinal>`).
    pub id: ChunkId,
    /// Document this chunk was cut from.
    pub source_document_id: String,
    /// 1-based page containing the chunk start, when page metadata is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Character offset of the first character in the document text.
    pub char_start: usize,
    /// Character offset one past the last character.
    pub char_end: usize,
    /// The chunk text, an exact slice of the document.
    pub text: String,
    /// Embedding vector, absent until embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Attach an embedding, consuming the chunk.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A chunk returned by search with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Distance to the query, lower is closer.
    pub distance: f32,
}

/// Summary of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// Number of distinct source documents.
    pub document_count: usize,
    /// Vector dimension, unset while empty.
    pub dimension: Option<usize>,
    /// Provider that produced every stored vector, unset while empty.
    pub embedding_provider_id: Option<String>,
    /// Metric applied at build and query time.
    pub metric: DistanceMetric,
}
