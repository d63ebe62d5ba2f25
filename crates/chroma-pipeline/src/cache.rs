//! Content-addressed store for pipeline operations.
//!
//! Entries are keyed by the operation's own cache id, which is derived from
//! its content, so an entry never needs replacing: puts are insert-if-absent.

use crate::error::CacheError;
use async_trait::async_trait;
use chroma_color::OperationData;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hint for backends that evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Backing store for operation data.
///
/// Implementations must be safe for concurrent use. Errors are treated as
/// misses or lost stores by the pipeline.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, cache_id: &str) -> Result<Option<Arc<OperationData>>, CacheError>;

    /// Store `data` unless `cache_id` is already present.
    async fn put(
        &self,
        cache_id: &str,
        data: Arc<OperationData>,
        priority: CachePriority,
    ) -> Result<(), CacheError>;
}

/// Snapshot of [`MemoryCache`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub entries: usize,
    /// LUT bytes held across all entries.
    pub bytes: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

struct Entry {
    data: Arc<OperationData>,
    priority: CachePriority,
}

/// In-process [`ResultCache`] without eviction.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    lookups: AtomicU64,
    hits: AtomicU64,
    insertions: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, cache_id: &str) -> bool {
        self.entries.lock().contains_key(cache_id)
    }

    /// Priority the entry was first stored with.
    pub fn priority(&self, cache_id: &str) -> Option<CachePriority> {
        self.entries.lock().get(cache_id).map(|e| e.priority)
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, bytes) = {
            let map = self.entries.lock();
            (map.len(), map.values().map(|e| e.data.size()).sum())
        };
        // Every hit is counted after its lookup: load hits first.
        let hits = self.hits.load(Ordering::Acquire);
        let lookups = self.lookups.load(Ordering::Acquire).max(hits);
        CacheStats {
            lookups,
            hits,
            misses: lookups.saturating_sub(hits),
            insertions: self.insertions.load(Ordering::Relaxed),
            entries,
            bytes,
        }
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, cache_id: &str) -> Result<Option<Arc<OperationData>>, CacheError> {
        self.lookups.fetch_add(1, Ordering::Release);
        let found = self.entries.lock().get(cache_id).map(|e| e.data.clone());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Release);
        }
        Ok(found)
    }

    async fn put(
        &self,
        cache_id: &str,
        data: Arc<OperationData>,
        priority: CachePriority,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(cache_id) {
            entries.insert(cache_id.to_string(), Entry { data, priority });
            self.insertions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
