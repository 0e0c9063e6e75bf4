//! Change-detection tags per collection.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Collection name to current version tag.
///
/// A tag is `"<record count>-<uuid>"`. It is reissued after every successful
/// mutation and is only a signal for pollers; writers never check it.
#[derive(Default)]
pub struct VersionTags {
    tags: RwLock<HashMap<String, String>>,
}

impl VersionTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tag of a collection, if one was issued.
    pub fn get(&self, name: &str) -> Option<String> {
        self.tags.read().get(name).cloned()
    }

    /// Issue a fresh tag for a collection holding `count` records.
    pub fn issue(&self, name: &str, count: usize) -> String {
        let tag = format!("{}-{}", count, Uuid::new_v4());
        self.tags.write().insert(name.to_string(), tag.clone());
        tag
    }

    /// Current tag, issuing one first if the collection has none yet.
    pub fn get_or_issue(&self, name: &str, count: impl FnOnce() -> usize) -> String {
        if let Some(tag) = self.get(name) {
            return tag;
        }
        let count = count();
        let mut tags = self.tags.write();
        tags.entry(name.to_string())
            .or_insert_with(|| format!("{}-{}", count, Uuid::new_v4()))
            .clone()
    }
}
