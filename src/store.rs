//! Main Store struct and the per-collection record store.

use crate::error::{Result, StoreError};
use crate::hooks::{DefaultHooks, RecordLifecycleHooks};
use crate::query::{QueryParams, QueryPlan};
use crate::registry::Registry;
use crate::schema::FieldSchema;
use crate::storage::DocumentStorage;
use crate::types::{IdScheme, Mutation, Record, RecordId, RecordState, ID_FIELD};
use fs2::FileExt;
use parking_lot::ReentrantMutex;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Name of the lock file guarding a store directory.
const LOCK_FILE: &str = ".lock";

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding one JSON document per collection.
    pub path: PathBuf,

    /// Keep loaded collections in memory between calls.
    pub cached: bool,

    /// Maximum number of cached collections (None = unbounded).
    pub cache_capacity: Option<usize>,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./jsonFiles"),
            cached: true,
            cache_capacity: None,
            create_if_missing: true,
        }
    }
}

/// A directory of collections.
///
/// Owns the directory lock, the document storage and the [`Registry`]
/// shared by every [`RecordStore`] it hands out.
pub struct Store {
    config: StoreConfig,

    /// Lock file for exclusive access.
    lock_file: File,

    storage: Arc<DocumentStorage>,

    registry: Arc<Registry>,
}

impl Store {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if config.path.exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        let registry = Arc::new(Self::registry_for(&config));
        Self::with_registry(config, registry)
    }

    /// Open an existing store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if !config.path.is_dir() {
            return Err(StoreError::NotInitialized);
        }
        let registry = Arc::new(Self::registry_for(&config));
        Self::with_registry(config, registry)
    }

    /// Open an existing store directory with an externally owned registry.
    pub fn with_registry(config: StoreConfig, registry: Arc<Registry>) -> Result<Self> {
        if !config.path.is_dir() {
            return Err(StoreError::NotInitialized);
        }

        let lock_file = Self::acquire_lock(&config.path)?;
        let storage = Arc::new(DocumentStorage::new(&config.path));

        info!(path = %config.path.display(), cached = config.cached, "store opened");

        Ok(Self {
            config,
            lock_file,
            storage,
            registry,
        })
    }

    /// Record store for a collection, validating with the schema only.
    pub fn collection(&self, schema: FieldSchema) -> Result<RecordStore> {
        self.collection_with_hooks(schema, DefaultHooks)
    }

    /// Record store for a collection with model-specific lifecycle hooks.
    pub fn collection_with_hooks(
        &self,
        schema: FieldSchema,
        hooks: impl RecordLifecycleHooks + 'static,
    ) -> Result<RecordStore> {
        RecordStore::new(
            schema,
            Arc::new(hooks),
            Arc::clone(&self.storage),
            Arc::clone(&self.registry),
            self.config.cached,
        )
    }

    /// Current version tag of a collection, if any was issued.
    pub fn version_tag(&self, collection: &str) -> Option<String> {
        self.registry.versions().get(collection)
    }

    /// Names of every collection persisted in this store.
    pub fn collections(&self) -> Result<Vec<String>> {
        self.storage.list()
    }

    pub fn storage(&self) -> &Arc<DocumentStorage> {
        &self.storage
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the store path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // --- Private Helpers ---

    fn registry_for(config: &StoreConfig) -> Registry {
        match config.cache_capacity {
            Some(capacity) => Registry::with_cache_capacity(capacity),
            None => Registry::new(),
        }
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

/// CRUD access to one collection.
///
/// Reads go through the registry's collection cache and fall back to the
/// document on disk. Every mutation loads, modifies and persists the whole
/// collection while holding the collection's lock, then republishes the
/// list to the cache and issues a new version tag.
#[derive(Clone)]
pub struct RecordStore {
    name: String,
    schema: Arc<FieldSchema>,
    hooks: Arc<dyn RecordLifecycleHooks>,
    storage: Arc<DocumentStorage>,
    registry: Arc<Registry>,
    cached: bool,
}

impl RecordStore {
    /// Create a record store over `storage`.
    ///
    /// Loads the collection and issues its version tag if none exists yet.
    /// Fails if the schema's collection name cannot be used as a document
    /// name.
    pub fn new(
        schema: FieldSchema,
        hooks: Arc<dyn RecordLifecycleHooks>,
        storage: Arc<DocumentStorage>,
        registry: Arc<Registry>,
        cached: bool,
    ) -> Result<Self> {
        let class = schema.class_name();
        if class.is_empty() || class.starts_with('.') || class.contains(['/', '\\']) {
            return Err(StoreError::InvalidSchema(format!(
                "invalid class name {:?}",
                class
            )));
        }
        let store = Self {
            name: schema.collection_name(),
            schema: Arc::new(schema),
            hooks,
            storage,
            registry,
            cached,
        };
        store.version_tag();
        Ok(store)
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    fn scheme(&self) -> IdScheme {
        self.schema.id_scheme()
    }

    // --- Reads ---

    /// Get a record by Id, completed and bound for readers.
    pub fn get(&self, id: &str) -> Option<Record> {
        self.get_unbound(id)
            .map(|record| self.hooks.bind_extra_data(record))
    }

    /// Get a record by Id with asset paths completed but no extra data bound.
    pub fn get_unbound(&self, id: &str) -> Option<Record> {
        let id = self.scheme().parse(id)?;
        self.find_raw(&id)
            .map(|record| self.hooks.complete_assets_path(record))
    }

    /// Query the collection.
    ///
    /// Every record is completed and bound before the query runs, so
    /// predicates and projections can address derived fields. Returns
    /// [`StoreError::InvalidQuery`] with every validation message when the
    /// parameters are rejected.
    pub fn get_all(&self, params: &QueryParams) -> Result<Vec<Record>> {
        self.query(params, true)
    }

    /// Query the collection without binding extra data.
    pub fn get_all_unbound(&self, params: &QueryParams) -> Result<Vec<Record>> {
        self.query(params, false)
    }

    fn query(&self, params: &QueryParams, bind: bool) -> Result<Vec<Record>> {
        let plan = match QueryPlan::parse(params, &self.schema) {
            Ok(plan) => plan,
            Err(e) => {
                debug!(collection = %self.name, error = %e, "query rejected");
                return Err(e);
            }
        };

        let view: Vec<Record> = self
            .records()
            .iter()
            .cloned()
            .map(|record| {
                let record = self.hooks.complete_assets_path(record);
                if bind {
                    self.hooks.bind_extra_data(record)
                } else {
                    record
                }
            })
            .collect();

        Ok(plan.execute(view))
    }

    /// First record whose `field` equals `value`, skipping the record with
    /// Id `excluded_id`.
    pub fn find_by_field(&self, field: &str, value: &Value, excluded_id: Option<&str>) -> Option<Record> {
        let excluded = excluded_id.and_then(|raw| self.scheme().parse(raw));
        self.records()
            .iter()
            .find(|r| {
                r.get(field) == Some(value) && excluded.as_ref().map_or(true, |id| !id.matches(r))
            })
            .cloned()
    }

    /// Every record satisfying `predicate`, in collection order.
    pub fn find_by_filter(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Record> {
        self.records()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Position of the record with Id `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        let id = self.scheme().parse(id)?;
        self.records().iter().position(|r| id.matches(r))
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.records().len()
    }

    /// Current version tag, issued on first request if the collection has
    /// not been written during this process.
    pub fn version_tag(&self) -> String {
        self.registry
            .versions()
            .get_or_issue(&self.name, || self.records().len())
    }

    // --- Writes ---

    /// Add a new record; the store assigns its Id.
    ///
    /// Any caller-supplied Id is discarded. The returned record is the one
    /// the store built, filled in as far as the call got, even when the
    /// state reports a validation failure or a key conflict.
    pub fn add(&self, record: Record) -> Result<Mutation<Record>> {
        let mut object = Record::new();
        object.insert(ID_FIELD.to_string(), self.scheme().placeholder());
        object.extend(record.into_iter().filter(|(k, _)| k != ID_FIELD));

        let mut state = RecordState::default();
        self.hooks.validate(&self.schema, &object, &mut state);
        if !state.is_valid {
            return Ok(Mutation { value: object, state });
        }

        self.write_with(|records| {
            if self.check_conflict(records, &object, None, &mut state) {
                return false;
            }
            let Some(id) = self.next_id(records) else {
                state.invalidate(format!("No identifier left in [{}]", self.name));
                return false;
            };
            object.insert(ID_FIELD.to_string(), id.to_value());
            self.hooks.handle_assets(&mut object, None);
            records.push(object.clone());
            true
        })?;

        Ok(Mutation { value: object, state })
    }

    /// Replace the record with Id `id`, handing both versions to the asset
    /// hook.
    pub fn update(&self, id: &str, record: Record) -> Result<Mutation<Option<Record>>> {
        self.update_with(id, record, true)
    }

    /// Replace the record with Id `id` without touching its assets.
    pub fn update_without_assets(&self, id: &str, record: Record) -> Result<Mutation<Option<Record>>> {
        self.update_with(id, record, false)
    }

    /// Every field except `Id` is overwritten; fields absent from `record`
    /// are dropped, not merged from the stored version. Returns the stored
    /// record as readers now see it.
    fn update_with(&self, raw_id: &str, record: Record, handle_assets: bool) -> Result<Mutation<Option<Record>>> {
        let id = self.scheme().parse(raw_id);

        let mut object = Record::new();
        let id_value = id
            .as_ref()
            .map_or_else(|| self.scheme().placeholder(), RecordId::to_value);
        object.insert(ID_FIELD.to_string(), id_value);
        object.extend(record.into_iter().filter(|(k, _)| k != ID_FIELD));

        let mut state = RecordState::default();
        self.hooks.validate(&self.schema, &object, &mut state);
        if !state.is_valid {
            return Ok(Mutation {
                value: self.get(raw_id),
                state,
            });
        }

        let not_found = |state: &mut RecordState| {
            state.add_error(format!("The resource [{}] does not exist.", raw_id));
            state.not_found = true;
        };

        let Some(id) = id else {
            not_found(&mut state);
            return Ok(Mutation { value: None, state });
        };

        self.write_with(|records| {
            let Some(index) = records.iter().position(|r| id.matches(r)) else {
                not_found(&mut state);
                return false;
            };
            if self.check_conflict(records, &object, Some(&id), &mut state) {
                return false;
            }
            if handle_assets {
                self.hooks.handle_assets(&mut object, Some(&records[index]));
            }
            records[index] = object;
            true
        })?;

        Ok(Mutation {
            value: self.get(raw_id),
            state,
        })
    }

    /// Remove the record with Id `id`. Returns whether one was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let Some(id) = self.scheme().parse(id) else {
            return Ok(false);
        };
        let mut removed = false;
        self.write_with(|records| {
            if let Some(index) = records.iter().position(|r| id.matches(r)) {
                records.remove(index);
                removed = true;
            }
            removed
        })?;
        Ok(removed)
    }

    /// Remove the records at the given positions. Out-of-range positions
    /// are ignored. Returns how many records were removed.
    pub fn remove_by_index(&self, indices: &[usize]) -> Result<usize> {
        let mut removed = 0;
        self.write_with(|records| {
            let before = records.len();
            let mut position = 0;
            records.retain(|_| {
                let keep = !indices.contains(&position);
                position += 1;
                keep
            });
            removed = before - records.len();
            removed > 0
        })?;
        Ok(removed)
    }

    /// Keep only the records satisfying `predicate`. Returns how many were
    /// removed.
    pub fn keep_by_filter(&self, predicate: impl Fn(&Record) -> bool) -> Result<usize> {
        let mut removed = 0;
        self.write_with(|records| {
            let before = records.len();
            records.retain(|r| predicate(r));
            removed = before - records.len();
            removed > 0
        })?;
        Ok(removed)
    }

    // --- Private Helpers ---

    fn find_raw(&self, id: &RecordId) -> Option<Record> {
        self.records().iter().find(|r| id.matches(r)).cloned()
    }

    /// Whether another record already holds `record`'s key value.
    fn check_conflict(
        &self,
        records: &[Record],
        record: &Record,
        excluded: Option<&RecordId>,
        state: &mut RecordState,
    ) -> bool {
        let Some(key) = self.schema.key() else {
            return false;
        };
        let Some(value) = record.get(key) else {
            return false;
        };
        let conflict = records.iter().any(|r| {
            r.get(key) == Some(value) && excluded.map_or(true, |id| !id.matches(r))
        });
        if conflict {
            state.add_error(format!("Unicity conflict on [{}]...", key));
            state.in_conflict = true;
        }
        conflict
    }

    /// Fresh Id for a new record, `None` once sequential Ids are exhausted.
    fn next_id(&self, records: &[Record]) -> Option<RecordId> {
        match self.scheme() {
            IdScheme::Secured => loop {
                let candidate = RecordId::Secured(Uuid::new_v4().to_string());
                if !records.iter().any(|r| candidate.matches(r)) {
                    break Some(candidate);
                }
            },
            IdScheme::Sequential => {
                let max = records
                    .iter()
                    .filter_map(|r| RecordId::of(r, IdScheme::Sequential))
                    .filter_map(|id| match id {
                        RecordId::Sequential(n) => Some(n),
                        RecordId::Secured(_) => None,
                    })
                    .max()
                    .unwrap_or(0);
                max.checked_add(1).map(RecordId::Sequential)
            }
        }
    }

    /// Current records for reading.
    ///
    /// A cache miss loads the document under the collection lock, so
    /// concurrent readers of a cold collection share one disk read. A
    /// missing document reads as empty; an unreadable one is logged and
    /// served as empty without being cached.
    fn records(&self) -> Arc<Vec<Record>> {
        if let Some(records) = self.cached_records() {
            return records;
        }

        let lock = self.registry.collection_lock(&self.name);
        let _guard = lock.lock();

        if let Some(records) = self.cached_records() {
            return records;
        }

        match self.storage.load(&self.name) {
            Ok(Some(records)) => {
                debug!(collection = %self.name, count = records.len(), "collection loaded");
                self.publish(Arc::new(records))
            }
            Ok(None) => {
                warn!(
                    collection = %self.name,
                    "collection does not exist yet, it will be created on demand"
                );
                self.publish(Arc::new(Vec::new()))
            }
            Err(e) => {
                error!(collection = %self.name, error = %e, "failed to read collection");
                Arc::new(Vec::new())
            }
        }
    }

    fn cached_records(&self) -> Option<Arc<Vec<Record>>> {
        if self.cached {
            self.registry.cache().find(&self.name)
        } else {
            None
        }
    }

    fn publish(&self, records: Arc<Vec<Record>>) -> Arc<Vec<Record>> {
        if self.cached {
            self.registry.cache().put(&self.name, Arc::clone(&records));
        }
        records
    }

    /// Run one read-modify-persist cycle under the collection lock.
    ///
    /// `modify` returns whether it changed the list; only then is the
    /// document rewritten, the cache refreshed and a new tag issued. Unlike
    /// reads, a document that cannot be parsed fails the write instead of
    /// being overwritten.
    fn write_with(&self, modify: impl FnOnce(&mut Vec<Record>) -> bool) -> Result<()> {
        let lock: Arc<ReentrantMutex<()>> = self.registry.collection_lock(&self.name);
        let _guard = lock.lock();

        let mut records = match self.cached_records() {
            Some(records) => records.as_ref().clone(),
            None => self.storage.load(&self.name)?.unwrap_or_default(),
        };

        if !modify(&mut records) {
            return Ok(());
        }

        self.storage.save(&self.name, &records)?;
        let count = records.len();
        self.publish(Arc::new(records));
        let tag = self.registry.versions().issue(&self.name, count);
        debug!(collection = %self.name, count, version = %tag, "collection persisted");

        Ok(())
    }
}
