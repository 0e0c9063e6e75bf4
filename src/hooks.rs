//! Lifecycle hooks a record store consults around reads and writes.

use crate::schema::FieldSchema;
use crate::types::{Record, RecordState};

/// Per-model behaviour plugged into a [`RecordStore`](crate::RecordStore).
///
/// Every method has a default: validation against the schema, and identity
/// for the asset and binding hooks.
pub trait RecordLifecycleHooks: Send + Sync {
    /// Validate a record about to be written, recording problems in `state`.
    fn validate(&self, schema: &FieldSchema, record: &Record, state: &mut RecordState) {
        schema.validate_record(record, state);
    }

    /// Turn stored asset names into full paths for readers.
    fn complete_assets_path(&self, record: Record) -> Record {
        record
    }

    /// Attach derived or joined fields for readers.
    fn bind_extra_data(&self, record: Record) -> Record {
        record
    }

    /// Persist new assets of `record` and release those only `previous` used.
    ///
    /// Runs inside the collection's write, after the record is accepted. It
    /// may read the same collection but must not write to it.
    fn handle_assets(&self, _record: &mut Record, _previous: Option<&Record>) {}
}

/// Hooks that only validate against the schema.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl RecordLifecycleHooks for DefaultHooks {}
