//! Process-wide state shared by every record store of a collection.
//!
//! - Collection cache: collection name to its full in-memory record list
//! - Version tags: collection name to its current change-detection tag
//!
//! Both are owned by a [`Registry`](crate::Registry) rather than living in
//! globals, so tests can build isolated instances.

mod collections;
mod versions;

pub use collections::CollectionCache;
pub use versions::VersionTags;
