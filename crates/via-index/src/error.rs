//! Error types for via-index.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for via-index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in via-index operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A vector's length differs from the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension established by the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Embeddings produced by a different provider than the one recorded in the index.
    #[error("Embedding provider mismatch: index holds '{expected}' vectors, got '{actual}'")]
    ProviderMismatch {
        /// Provider recorded in the index.
        expected: String,
        /// Provider of the rejected batch.
        actual: String,
    },

    /// A chunk reached the index without an embedding.
    #[error("Chunk '{0}' has no embedding")]
    MissingEmbedding(String),

    /// Invalid vector (empty, NaN or infinite components).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Search was asked for zero results.
    #[error("Invalid k: search requires k >= 1")]
    InvalidK,

    /// No persisted index exists at the location.
    #[error("No index found at {0}")]
    IndexNotFound(PathBuf),

    /// The persisted index exists but cannot be trusted.
    #[error("Index at {path} is corrupt: {reason}")]
    IndexCorrupt {
        /// Location of the artifact.
        path: PathBuf,
        /// What failed validation.
        reason: String,
    },

    /// Serialization failure while writing.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::IndexCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
