//! Whole-document JSON persistence.
//!
//! Each collection lives in one `<name>.json` file holding a JSON array of
//! records. Reads load the entire array; writes replace the entire file.

use crate::error::{Result, StoreError};
use crate::types::Record;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Extension of collection documents.
const DOCUMENT_EXTENSION: &str = "json";

/// Extension of the scratch file a write goes through before the rename.
const TEMP_EXTENSION: &str = "json.tmp";

/// Directory of collection documents.
pub struct DocumentStorage {
    path: PathBuf,

    /// Documents read from disk so far.
    reads: AtomicU64,
}

impl DocumentStorage {
    /// Storage rooted at an existing directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reads: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of documents read from disk by [`load`](Self::load).
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Path of a collection's document.
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{}.{}", name, DOCUMENT_EXTENSION))
    }

    /// Whether a collection has been written at least once.
    pub fn exists(&self, name: &str) -> bool {
        self.document_path(name).exists()
    }

    /// Load a whole collection.
    ///
    /// Returns `None` when the document does not exist yet. A document that
    /// is not a JSON array of objects is reported as corruption.
    pub fn load(&self, name: &str) -> Result<Option<Vec<Record>>> {
        let bytes = match fs::read(self.document_path(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.reads.fetch_add(1, Ordering::Relaxed);

        let corrupt = |reason: String| StoreError::Corruption {
            collection: name.to_string(),
            reason,
        };

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(corrupt("document is not a JSON array".into()));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(corrupt(format!("element {} is not an object", i))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Replace a collection's document with `records`.
    ///
    /// The array is written to a sibling scratch file, synced, then renamed
    /// over the document, so readers never observe a half-written file.
    pub fn save(&self, name: &str, records: &[Record]) -> Result<()> {
        let payload = serde_json::to_vec(records)?;

        let temp_path = self.path.join(format!("{}.{}", name, TEMP_EXTENSION));
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, self.document_path(name))?;

        Ok(())
    }

    /// Delete a collection's document.
    pub fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.document_path(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of every collection with a document on disk.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
