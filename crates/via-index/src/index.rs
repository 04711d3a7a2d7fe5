//! Exact nearest-neighbour index.
//!
//! The index is a plain ordered sequence of embedded chunks plus the two
//! invariants that make their vectors comparable: a single dimension and a
//! single embedding provider. Search scans every vector, which is exact and
//! fast enough for a per-deployment document corpus.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{Chunk, IndexStats, SearchHit};
use std::collections::HashSet;
use tracing::{debug, trace};

/// In-memory vector index over document chunks.
///
/// A new index is empty and untyped; the first inserted batch fixes its
/// `dimension` and `embedding_provider_id`. Inserts either apply completely
/// or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: Option<usize>,
    embedding_provider_id: Option<String>,
    metric: DistanceMetric,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Create an empty index using the given metric.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            dimension: None,
            embedding_provider_id: None,
            metric,
            chunks: Vec::new(),
        }
    }

    /// Rebuild an index from already validated parts.
    pub(crate) fn from_parts(
        dimension: Option<usize>,
        embedding_provider_id: Option<String>,
        metric: DistanceMetric,
        chunks: Vec<Chunk>,
    ) -> Self {
        Self {
            dimension,
            embedding_provider_id,
            metric,
            chunks,
        }
    }

    /// Vector dimension, `None` while the index is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Provider that produced every stored vector, `None` while empty.
    pub fn embedding_provider_id(&self) -> Option<&str> {
        self.embedding_provider_id.as_deref()
    }

    /// Metric used for search.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Whether any chunk was cut from the given document.
    pub fn contains_source(&self, source_document_id: &str) -> bool {
        self.chunks
            .iter()
            .any(|c| c.source_document_id == source_document_id)
    }

    /// Summary counters for display.
    pub fn stats(&self) -> IndexStats {
        let documents: HashSet<&str> = self
            .chunks
            .iter()
            .map(|c| c.source_document_id.as_str())
            .collect();

        IndexStats {
            chunk_count: self.chunks.len(),
            document_count: documents.len(),
            dimension: self.dimension,
            embedding_provider_id: self.embedding_provider_id.clone(),
            metric: self.metric,
        }
    }

    /// Append a batch of embedded chunks produced by `provider_id`.
    ///
    /// The whole batch is validated before anything is appended, so on error
    /// the index is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::ProviderMismatch`] if the index already holds vectors from
    ///   another provider.
    /// - [`Error::DimensionMismatch`] if any vector length differs from the
    ///   index dimension (or, for an empty index, from the first chunk).
    /// - [`Error::MissingEmbedding`] / [`Error::InvalidVector`] for chunks
    ///   that cannot be indexed.
    pub fn insert(&mut self, provider_id: &str, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        if let Some(expected) = &self.embedding_provider_id {
            if expected != provider_id {
                return Err(Error::ProviderMismatch {
                    expected: expected.clone(),
                    actual: provider_id.to_string(),
                });
            }
        }

        let expected_dim = match self.dimension {
            Some(dim) => dim,
            None => {
                let first = &chunks[0];
                first
                    .embedding
                    .as_ref()
                    .map(Vec::len)
                    .ok_or_else(|| Error::MissingEmbedding(first.id.clone()))?
            }
        };

        for chunk in &chunks {
            let embedding = chunk
                .embedding
                .as_ref()
                .ok_or_else(|| Error::MissingEmbedding(chunk.id.clone()))?;
            if embedding.len() != expected_dim {
                return Err(Error::DimensionMismatch {
                    expected: expected_dim,
                    actual: embedding.len(),
                });
            }
            validate_vector(embedding)?;
        }

        let count = chunks.len();
        self.dimension = Some(expected_dim);
        self.embedding_provider_id = Some(provider_id.to_string());
        self.chunks.extend(chunks);

        debug!(count, total = self.chunks.len(), "Inserted chunks");
        Ok(count)
    }

    /// Return the `k` chunks closest to `query`, nearest first.
    ///
    /// Ties are broken by insertion order. An empty index yields an empty
    /// result; fewer than `k` chunks yield all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidK);
        }
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        validate_vector(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                chunk
                    .embedding
                    .as_ref()
                    .map(|v| (i, self.metric.distance(query, v)))
            })
            .collect();

        let order = |a: &(usize, f32), b: &(usize, f32)| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0));
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, order);
            scored.truncate(k);
        }
        scored.sort_by(order);

        trace!(k, returned = scored.len(), "Search complete");

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                chunk: self.chunks[i].clone(),
                distance,
            })
            .collect())
    }
}

pub(crate) fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::InvalidVector("vector is empty".to_string()));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidVector(
            "vector contains NaN or infinite components".to_string(),
        ));
    }
    Ok(())
}
