//! In-memory cache of whole collections.

use crate::types::Record;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Collection name to full record list.
///
/// Entries are replaced wholesale on every write-through and never mutated in
/// place, so readers can hold an `Arc` to a list while writers publish the
/// next one. Unbounded unless a capacity is given, in which case the least
/// recently used collection is evicted and reloaded from disk on next access.
pub struct CollectionCache {
    entries: Mutex<LruCache<String, Arc<Vec<Record>>>>,
}

impl CollectionCache {
    /// Cache that keeps every collection for the life of the process.
    pub fn unbounded() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Cache holding at most `capacity` collections.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get the cached list of a collection.
    pub fn find(&self, name: &str) -> Option<Arc<Vec<Record>>> {
        self.entries.lock().get(name).cloned()
    }

    /// Unconditionally replace the cached list of a collection.
    pub fn put(&self, name: &str, records: Arc<Vec<Record>>) {
        self.entries.lock().put(name.to_string(), records);
    }

    /// Drop a collection from the cache.
    pub fn remove(&self, name: &str) -> bool {
        self.entries.lock().pop(name).is_some()
    }

    /// Number of cached collections.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CollectionCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
