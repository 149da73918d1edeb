//! Schema migrations for the persisted document.
//!
//! Migrations are versioned and applied on load. The top-level
//! `schema_version` field tracks the document version; documents without
//! one are treated as version 1.

use serde_json::{Map, Value};

use crate::error::StorageError;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_SCHEMA_VERSION: u64 = 2;

/// Bring a loaded document up to [`CURRENT_SCHEMA_VERSION`].
///
/// Returns `true` when anything was rewritten.
///
/// # Errors
/// Returns an error if the document was written by a newer schema.
pub fn migrate(doc: &mut Value) -> Result<bool, StorageError> {
    let version = schema_version(doc);
    if version > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if version < 2 {
        migrate_v2(doc);
    }

    if let Some(obj) = doc.as_object_mut() {
        obj.insert("schema_version".into(), CURRENT_SCHEMA_VERSION.into());
    }
    Ok(version < CURRENT_SCHEMA_VERSION)
}

pub fn schema_version(doc: &Value) -> u64 {
    doc.get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1)
}

/// Migration v2: per-chore `shared_chore` flag becomes `completion_mode`,
/// and `allow_multiple_claims_per_day` becomes an approval-reset policy.
fn migrate_v2(doc: &mut Value) {
    let Some(chores) = doc.get_mut("chores").and_then(Value::as_object_mut) else {
        return;
    };
    for chore in chores.values_mut().filter_map(Value::as_object_mut) {
        migrate_chore_v2(chore);
    }
}

fn migrate_chore_v2(chore: &mut Map<String, Value>) {
    if let Some(shared) = chore.remove("shared_chore") {
        if !chore.contains_key("completion_mode") {
            let mode = if shared.as_bool().unwrap_or(false) {
                "shared_all"
            } else {
                "independent"
            };
            chore.insert("completion_mode".into(), mode.into());
        }
    }

    if let Some(multiple) = chore.remove("allow_multiple_claims_per_day") {
        if !chore.contains_key("approval_reset") {
            let policy = if multiple.as_bool().unwrap_or(false) {
                "at_midnight_multiple"
            } else {
                "at_midnight_once"
            };
            chore.insert("approval_reset".into(), policy.into());
        }
    }
}
