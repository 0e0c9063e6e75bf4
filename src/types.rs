//! Core types for the record store.

use serde_json::{Map, Value};
use std::fmt;

/// Name of the identity field every record carries.
pub const ID_FIELD: &str = "Id";

/// A single record: an ordered key-value map over JSON values.
///
/// The field set is described at runtime by a
/// [`FieldSchema`](crate::FieldSchema), so records stay untyped.
pub type Record = Map<String, Value>;

/// Identity of a record, in one of the two schemes a collection may use.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Positive auto-incrementing integer.
    Sequential(u64),
    /// Opaque unique string.
    Secured(String),
}

impl RecordId {
    /// JSON value stored in the record's `Id` field.
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Sequential(n) => Value::from(*n),
            RecordId::Secured(s) => Value::String(s.clone()),
        }
    }

    /// Read the identity of a stored record under the given scheme.
    pub fn of(record: &Record, scheme: IdScheme) -> Option<Self> {
        match (scheme, record.get(ID_FIELD)?) {
            (IdScheme::Sequential, Value::Number(n)) => n.as_u64().map(RecordId::Sequential),
            (IdScheme::Secured, Value::String(s)) => Some(RecordId::Secured(s.clone())),
            _ => None,
        }
    }

    /// Whether `record` carries this identity.
    pub fn matches(&self, record: &Record) -> bool {
        record.get(ID_FIELD) == Some(&self.to_value())
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Sequential(n) => write!(f, "RecordId({})", n),
            RecordId::Secured(s) => write!(f, "RecordId({:?})", s),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Sequential(n) => write!(f, "{}", n),
            RecordId::Secured(s) => write!(f, "{}", s),
        }
    }
}

/// How a collection assigns and compares record identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdScheme {
    Sequential,
    Secured,
}

impl IdScheme {
    /// Normalize an externally supplied Id.
    ///
    /// Sequential Ids are integer-parsed (leading/trailing whitespace
    /// ignored); secured Ids are taken verbatim. Returns `None` when the raw
    /// value cannot name any record of this scheme.
    pub fn parse(self, raw: &str) -> Option<RecordId> {
        match self {
            IdScheme::Sequential => raw.trim().parse::<u64>().ok().map(RecordId::Sequential),
            IdScheme::Secured => Some(RecordId::Secured(raw.to_string())),
        }
    }

    /// Value an `Id` holds before the store assigns one.
    pub fn placeholder(self) -> Value {
        match self {
            IdScheme::Sequential => Value::from(0u64),
            IdScheme::Secured => Value::String(String::new()),
        }
    }
}

/// Outcome flags and messages accumulated while a mutation runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordState {
    pub is_valid: bool,
    pub in_conflict: bool,
    pub not_found: bool,
    pub errors: Vec<String>,
}

impl Default for RecordState {
    fn default() -> Self {
        Self {
            is_valid: true,
            in_conflict: false,
            not_found: false,
            errors: Vec::new(),
        }
    }
}

impl RecordState {
    /// Record a message without changing any flag.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a validation message and mark the record invalid.
    pub fn invalidate(&mut self, message: impl Into<String>) {
        self.add_error(message);
        self.is_valid = false;
    }

    /// True when the mutation was applied.
    pub fn succeeded(&self) -> bool {
        self.is_valid && !self.in_conflict && !self.not_found
    }
}

/// Result of a mutation together with the state the hooks and the store
/// accumulated along the way.
#[derive(Clone, Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub state: RecordState,
}

impl<T> Mutation<T> {
    /// True when the mutation was applied and persisted.
    pub fn succeeded(&self) -> bool {
        self.state.succeeded()
    }

    /// Discard the state, keeping the value.
    pub fn into_value(self) -> T {
        self.value
    }
}
