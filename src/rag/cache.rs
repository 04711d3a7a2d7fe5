//! Query Embedding Cache
//!
//! Users tend to ask the same questions again ("what is my deductible?").
//! Caching the query vector skips the embedding round trip for repeats.
//!
//! # Cache Key Strategy
//!
//! Keys are SHA-256 hashes of `embedding_provider_id + query`, so vectors
//! from one embedding model are never returned for another.
//!
//! # Example
//!
//! ```ignore
//! use via::rag::cache::QueryCache;
//!
//! let cache = QueryCache::new(256);
//! let key = QueryCache::compute_key("openai:text-embedding-3-small", "What is covered?");
//! if let Some(vector) = cache.get(&key) {
//!     // use cached vector
//! } else {
//!     let vector = embedder.embed(query).await?;
//!     cache.put(key, vector.clone());
//! }
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries in cache
    pub entry_count: usize,
    /// Maximum number of entries, 0 when disabled
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Bounded LRU cache of query embeddings. Thread-safe via
/// `parking_lot::Mutex`; a capacity of 0 disables it.
pub struct QueryCache {
    entries: Option<Mutex<LruCache<String, Vec<f32>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Create a cache holding up to `capacity` vectors.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Compute a cache key for the given embedding provider and query
    pub fn compute_key(provider_id: &str, query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider_id.as_bytes());
        hasher.update(b"|");
        hasher.update(query.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up a vector, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let entries = self.entries.as_ref()?;
        match entries.lock().get(key) {
            Some(vector) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(vector.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a vector, evicting the least recently used entry when full.
    pub fn put(&self, key: String, vector: Vec<f32>) {
        if let Some(entries) = &self.entries {
            entries.lock().put(key, vector);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    /// Number of cached vectors
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.lock().len())
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let (entry_count, capacity) = match &self.entries {
            Some(entries) => {
                let entries = entries.lock();
                (entries.len(), entries.cap().get())
            }
            None => (0, 0),
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            capacity,
        }
    }
}
