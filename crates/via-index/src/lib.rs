//! # via-index
//!
//! An embedded, exact-search vector index for document chunks, with a
//! single-file persisted form that is written atomically and verified on load.
//!
//! ## Features
//!
//! - **Exact search**: every query scans all stored vectors, results are
//!   ordered by ascending distance with insertion order breaking ties
//! - **Consistent vectors**: one dimension and one embedding provider per index
//! - **All-or-nothing inserts**: a rejected batch leaves the index unchanged
//! - **Atomic persistence**: temp file, sync, rename; checksum verified on load
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use via_index::{Chunk, DistanceMetric, VectorIndex};
//!
//! let mut index = VectorIndex::new(DistanceMetric::Cosine);
//! index.insert("ollama:nomic-embed-text", embedded_chunks)?;
//! via_index::save_index(&index, path).await?;
//!
//! let hits = index.search(&query_vector, 3)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::VectorIndex;
pub use persistence::{load_index, save_index};
pub use types::{Chunk, ChunkId, IndexStats, SearchHit};
