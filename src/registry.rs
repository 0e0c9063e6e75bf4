//! Shared registry of caches, version tags and per-collection locks.

use crate::cache::{CollectionCache, VersionTags};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// State shared by every [`RecordStore`](crate::RecordStore) of a process.
///
/// Created once (usually by [`Store`](crate::Store)) and handed to each
/// record store. The per-collection lock serializes read-modify-persist
/// cycles and makes cold-cache population single-flight.
pub struct Registry {
    cache: CollectionCache,
    versions: VersionTags,
    locks: Mutex<HashMap<String, Arc<ReentrantMutex<()>>>>,
}

impl Registry {
    /// Registry with an unbounded collection cache.
    pub fn new() -> Self {
        Self::with_cache(CollectionCache::unbounded())
    }

    /// Registry whose collection cache holds at most `capacity` collections.
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self::with_cache(CollectionCache::with_capacity(capacity))
    }

    fn with_cache(cache: CollectionCache) -> Self {
        Self {
            cache,
            versions: VersionTags::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &CollectionCache {
        &self.cache
    }

    pub fn versions(&self) -> &VersionTags {
        &self.versions
    }

    /// Lock guarding one collection's load and write paths.
    ///
    /// Re-entrant, so a lifecycle hook running inside a write may read the
    /// same collection on its thread.
    pub fn collection_lock(&self, name: &str) -> Arc<ReentrantMutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
        )
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
