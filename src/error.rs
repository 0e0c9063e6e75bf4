//! Error types for the record store.

use thiserror::Error;

/// Main error type for store operations.
///
/// Business outcomes of a mutation (invalid record, key conflict, unknown Id)
/// are not errors; they travel in the [`RecordState`](crate::RecordState) of
/// the returned [`Mutation`](crate::Mutation).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt document for collection {collection}: {reason}")]
    Corruption { collection: String, reason: String },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid query: {}", .0.join("; "))]
    InvalidQuery(Vec<String>),
}

impl StoreError {
    /// Validation messages of a rejected query, if this is one.
    pub fn query_messages(&self) -> Option<&[String]> {
        match self {
            StoreError::InvalidQuery(messages) => Some(messages),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
