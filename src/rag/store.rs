//! Shared handle to the persisted vector index.
//!
//! Readers take a snapshot (`Arc<VectorIndex>`) and search it without
//! locking. Writers are serialized: an insert clones the current index,
//! appends to the clone, persists it, and only then publishes it. A reader
//! therefore sees either the old or the new index, never half of an insert,
//! and a failed insert or persist leaves both copies untouched.

use arc_swap::ArcSwapOption;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use via_index::{
    load_index, save_index, Chunk, DistanceMetric, Error as IndexError, IndexStats, SearchHit,
    VectorIndex,
};

use crate::types::IngestError;

/// Persisted vector index with single-writer discipline.
pub struct IndexStore {
    path: PathBuf,
    metric: DistanceMetric,
    current: ArcSwapOption<VectorIndex>,
    writer: Mutex<()>,
}

impl IndexStore {
    /// Open the index at `path`, if one exists.
    ///
    /// A missing file is not an error: the store starts without an index and
    /// creates one on the first ingestion. An existing index built by a
    /// different embedding provider is refused.
    pub async fn open(
        path: impl Into<PathBuf>,
        metric: DistanceMetric,
        embedding_provider_id: &str,
    ) -> Result<Self, IndexError> {
        let path = path.into();
        let current = match load_index(&path).await {
            Ok(index) => {
                if let Some(stored) = index.embedding_provider_id() {
                    if stored != embedding_provider_id {
                        return Err(IndexError::ProviderMismatch {
                            expected: stored.to_string(),
                            actual: embedding_provider_id.to_string(),
                        });
                    }
                }
                if index.metric() != metric {
                    warn!(
                        stored = index.metric().name(),
                        configured = metric.name(),
                        "Index was built with a different metric, keeping the stored one"
                    );
                }
                info!(
                    path = %path.display(),
                    chunks = index.len(),
                    dimension = ?index.dimension(),
                    "Loaded vector index"
                );
                Some(Arc::new(index))
            }
            Err(IndexError::IndexNotFound(_)) => {
                info!(path = %path.display(), "No vector index yet");
                None
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            metric,
            current: ArcSwapOption::new(current),
            writer: Mutex::new(()),
        })
    }

    /// Location of the persisted index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current index, `None` before the first ingestion.
    pub fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.current.load_full()
    }

    /// Whether `source_id` already has chunks in the index.
    pub fn contains_source(&self, source_id: &str) -> bool {
        self.snapshot()
            .map_or(false, |index| index.contains_source(source_id))
    }

    /// Statistics of the current index.
    pub fn stats(&self) -> Option<IndexStats> {
        self.snapshot().map(|index| index.stats())
    }

    /// Search the current index. `None` when no index exists.
    pub fn search(&self, query: &[f32], k: usize) -> Option<Result<Vec<SearchHit>, IndexError>> {
        self.snapshot().map(|index| index.search(query, k))
    }

    /// Add the embedded chunks of one document, then persist.
    ///
    /// The duplicate check runs under the writer lock, so two concurrent
    /// ingestions of the same source cannot both succeed.
    pub async fn insert_document(
        &self,
        embedding_provider_id: &str,
        source_id: &str,
        chunks: Vec<Chunk>,
    ) -> Result<usize, IngestError> {
        let _guard = self.writer.lock().await;

        let mut next = match self.current.load_full() {
            Some(index) => {
                if index.contains_source(source_id) {
                    return Err(IngestError::AlreadyIndexed(source_id.to_string()));
                }
                VectorIndex::clone(&index)
            }
            None => VectorIndex::new(self.metric),
        };

        let inserted = next.insert(embedding_provider_id, chunks)?;
        save_index(&next, &self.path).await?;

        let total = next.len();
        self.current.store(Some(Arc::new(next)));
        info!(source = source_id, chunks = inserted, total, "Index updated");
        Ok(inserted)
    }
}
