// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entities tracked for synchronization.
//!
//! An [`Entity`] is a domain record (a shopping-list item, a pantry shelf
//! entry, a recipe) whose fields are opaque JSON to the engine. The engine
//! only cares about identity and sync state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Domain fields of an entity.
pub type Fields = Map<String, Value>;

/// Keys the engine owns inside pushed and pulled payloads.
///
/// Domain fields with these names are dropped on the way in.
pub const RESERVED_KEYS: &[&str] =
    &["id", "localId", "serverId", "collection", "updatedAt", "deleted", "synced"];

/// A domain record tracked for synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Locally generated identifier, also the idempotency key.
    pub id: String,
    /// Collection the entity belongs to (e.g. `shopping`).
    pub collection: String,
    /// Domain fields.
    pub fields: Fields,
    pub updated_at: DateTime<Utc>,
    /// False while a local mutation is not yet acknowledged.
    pub synced: bool,
    /// Identifier assigned by the server of record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Local tombstone set by a pending delete.
    #[serde(default)]
    pub deleted: bool,
}

impl Entity {
    /// Creates a new unsynced entity with a fresh local id.
    pub fn new(collection: impl Into<String>, fields: Fields, now: DateTime<Utc>) -> Self {
        Entity {
            id: new_local_id(),
            collection: collection.into(),
            fields: strip_reserved(fields),
            updated_at: now,
            synced: false,
            server_id: None,
            deleted: false,
        }
    }

    /// Shallow-merges `patch` into the entity fields.
    ///
    /// A `null` value removes the key.
    pub fn merge_fields(&mut self, patch: &Fields) {
        merge_fields(&mut self.fields, patch);
    }

    /// Returns a field as a string, if present and a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Generates a new local identifier.
pub fn new_local_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Shallow-merges `patch` into `target`. `null` deletes the key.
pub fn merge_fields(target: &mut Fields, patch: &Fields) {
    for (key, value) in patch {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Removes engine-owned keys from a field map.
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for key in RESERVED_KEYS {
        fields.remove(*key);
    }
    fields
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
