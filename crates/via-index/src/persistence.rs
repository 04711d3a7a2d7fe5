//! Persistence layer for via-index.
//!
//! An index is stored as one self-describing JSON artifact:
//!
//! ```text
//! {
//!   "format": "via-index", "version": 1,
//!   "dimension": 1536, "embedding_provider_id": "openai:text-embedding-3-small",
//!   "metric": "cosine", "chunk_count": 42,
//!   "checksum": "<sha256 of the exact chunks bytes>",
//!   "created_at": "...",
//!   "chunks": [ ... ]
//! }
//! ```
//!
//! Writes go to a sibling temp file that is synced and renamed over the
//! target, so readers only ever see the previous or the new artifact.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::{validate_vector, VectorIndex};
use crate::types::Chunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const FORMAT_NAME: &str = "via-index";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct IndexFileOut<'a> {
    format: &'a str,
    version: u32,
    dimension: Option<usize>,
    embedding_provider_id: Option<&'a str>,
    metric: DistanceMetric,
    chunk_count: usize,
    checksum: String,
    created_at: DateTime<Utc>,
    chunks: &'a RawValue,
}

#[derive(Deserialize)]
struct IndexFileIn {
    format: String,
    version: u32,
    dimension: Option<usize>,
    embedding_provider_id: Option<String>,
    metric: DistanceMetric,
    chunk_count: usize,
    checksum: String,
    chunks: Box<RawValue>,
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `index` to `path` atomically.
///
/// Parent directories are created as needed. On failure the previous
/// artifact (if any) is left untouched.
pub async fn save_index(index: &VectorIndex, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let chunks_json = serde_json::to_string(index.chunks())
        .map_err(|e| Error::Persistence(format!("Failed to serialize chunks: {}", e)))?;
    let chunks_raw = RawValue::from_string(chunks_json)
        .map_err(|e| Error::Persistence(format!("Failed to wrap chunks: {}", e)))?;

    let file = IndexFileOut {
        format: FORMAT_NAME,
        version: FORMAT_VERSION,
        dimension: index.dimension(),
        embedding_provider_id: index.embedding_provider_id(),
        metric: index.metric(),
        chunk_count: index.len(),
        checksum: checksum(chunks_raw.get().as_bytes()),
        created_at: Utc::now(),
        chunks: &chunks_raw,
    };
    let body = serde_json::to_vec(&file)
        .map_err(|e| Error::Persistence(format!("Failed to serialize index: {}", e)))?;

    let tmp = temp_path(path);
    let write_result = async {
        let mut out = tokio::fs::File::create(&tmp).await?;
        out.write_all(&body).await?;
        out.flush().await?;
        out.sync_all().await?;
        drop(out);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = write_result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    info!(path = ?path, chunks = index.len(), bytes = body.len(), "Saved index");
    Ok(())
}

/// Load and validate the index stored at `path`.
///
/// # Errors
///
/// - [`Error::IndexNotFound`] when nothing exists at `path`.
/// - [`Error::IndexCorrupt`] when the artifact fails any structural or
///   integrity check.
pub async fn load_index(path: &Path) -> Result<VectorIndex> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::IndexNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let file: IndexFileIn = serde_json::from_slice(&bytes)
        .map_err(|e| Error::corrupt(path, format!("unparsable artifact: {}", e)))?;

    if file.format != FORMAT_NAME {
        return Err(Error::corrupt(path, format!("unknown format '{}'", file.format)));
    }
    if file.version != FORMAT_VERSION {
        return Err(Error::corrupt(
            path,
            format!("unsupported version {}", file.version),
        ));
    }
    if checksum(file.chunks.get().as_bytes()) != file.checksum {
        return Err(Error::corrupt(path, "checksum mismatch"));
    }

    let chunks: Vec<Chunk> = serde_json::from_str(file.chunks.get())
        .map_err(|e| Error::corrupt(path, format!("unparsable chunks: {}", e)))?;

    if chunks.len() != file.chunk_count {
        return Err(Error::corrupt(
            path,
            format!(
                "header declares {} chunks, found {}",
                file.chunk_count,
                chunks.len()
            ),
        ));
    }

    match (&file.dimension, &file.embedding_provider_id) {
        (Some(_), Some(_)) => {}
        (None, None) if chunks.is_empty() => {}
        _ => {
            return Err(Error::corrupt(
                path,
                "dimension and embedding provider must both be set for a non-empty index",
            ));
        }
    }

    if let Some(dimension) = file.dimension {
        for chunk in &chunks {
            let embedding = chunk
                .embedding
                .as_ref()
                .ok_or_else(|| Error::corrupt(path, format!("chunk '{}' has no embedding", chunk.id)))?;
            if embedding.len() != dimension {
                return Err(Error::corrupt(
                    path,
                    format!(
                        "chunk '{}' has dimension {}, index declares {}",
                        chunk.id,
                        embedding.len(),
                        dimension
                    ),
                ));
            }
            validate_vector(embedding)
                .map_err(|e| Error::corrupt(path, format!("chunk '{}': {}", chunk.id, e)))?;
        }
    }

    debug!(path = ?path, chunks = chunks.len(), "Loaded index");
    Ok(VectorIndex::from_parts(
        file.dimension,
        file.embedding_provider_id,
        file.metric,
        chunks,
    ))
}
