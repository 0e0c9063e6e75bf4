//! # Collection Store
//!
//! A file-backed store of JSON record collections with a declarative query
//! layer.
//!
//! ## Core Concepts
//!
//! - **Collections**: One JSON array document per record class
//! - **Schemas**: Ordered field definitions, a unique key and an Id scheme
//! - **Cache**: Loaded collections shared across handles, with version tags
//! - **Queries**: Predicates, keywords, projection, ranges, sort and paging
//!
//! ## Example
//!
//! ```ignore
//! use collection_store::{FieldSchema, FieldType, QueryParams, Store, StoreConfig};
//!
//! let store = Store::open_or_create(StoreConfig {
//!     path: "./jsonFiles".into(),
//!     ..Default::default()
//! })?;
//!
//! let courses = store.collection(
//!     FieldSchema::new("Course")
//!         .with_field("Title", FieldType::String)
//!         .with_field("Code", FieldType::String)
//!         .with_key("Code"),
//! )?;
//!
//! let added = courses.add(json!({"Title": "Algebra", "Code": "MAT1"}).as_object().cloned().unwrap())?;
//! assert!(added.succeeded());
//!
//! let page = courses.get_all(&QueryParams::new().with("Title", "alg*").with("sort", "-Code"))?;
//! ```

pub mod cache;
pub mod error;
pub mod hooks;
pub mod query;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use cache::{CollectionCache, VersionTags};
pub use error::{Result, StoreError};
pub use hooks::{DefaultHooks, RecordLifecycleHooks};
pub use query::{QueryParams, QueryPlan};
pub use registry::Registry;
pub use schema::{FieldDef, FieldSchema, FieldType};
pub use storage::DocumentStorage;
pub use store::{RecordStore, Store, StoreConfig};
pub use types::*;
