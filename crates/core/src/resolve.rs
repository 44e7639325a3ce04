// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution between local entities and pulled server records.
//!
//! Policy ([`UnsyncedLocalWins`]):
//! - local copy unsynced (pending or failed change, pending delete): the
//!   server record is discarded for this cycle and counted as a conflict
//! - local copy synced: the server record overwrites it
//! - no local copy: the server record is inserted as settled
//!
//! Discarded records are re-evaluated on the next pull once the local change
//! is acknowledged. All resolutions are idempotent: applying the same record
//! twice leaves the same state.

use crate::entity::Entity;
use crate::protocol::ServerRecord;

/// What to do with one pulled record.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No local copy; store the record as a new settled entity.
    Insert(Entity),
    /// Settled local copy replaced by the server version.
    Overwrite(Entity),
    /// Settled local copy deleted on the server.
    Remove { id: String },
    /// Unsynced local copy wins for this cycle.
    KeepLocal { id: String },
    /// Server deletion of an entity we never had.
    Ignore,
}

impl Resolution {
    /// Returns true if the server record was discarded in favour of local state.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Resolution::KeepLocal { .. })
    }

    /// Returns true if local state changes.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            Resolution::Insert(_) | Resolution::Overwrite(_) | Resolution::Remove { .. }
        )
    }
}

/// Decides how a pulled record merges with the matching local entity.
///
/// `local` is the entity matched by server id, then by idempotency key.
pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, collection: &str, local: Option<&Entity>, record: &ServerRecord)
        -> Resolution;
}

/// The default policy: in-flight local edits are never clobbered by a pull.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsyncedLocalWins;

impl ConflictResolver for UnsyncedLocalWins {
    fn resolve(
        &self,
        collection: &str,
        local: Option<&Entity>,
        record: &ServerRecord,
    ) -> Resolution {
        match local {
            Some(local) if !local.synced => Resolution::KeepLocal { id: local.id.clone() },
            Some(local) if record.deleted => Resolution::Remove { id: local.id.clone() },
            Some(local) => Resolution::Overwrite(Entity {
                id: local.id.clone(),
                collection: local.collection.clone(),
                fields: record.domain_fields(),
                updated_at: record.updated_at,
                synced: true,
                server_id: Some(record.id.clone()),
                deleted: false,
            }),
            None if record.deleted => Resolution::Ignore,
            None => Resolution::Insert(Entity {
                id: record.local_id.clone().unwrap_or_else(|| record.id.clone()),
                collection: record.collection.clone().unwrap_or_else(|| collection.to_string()),
                fields: record.domain_fields(),
                updated_at: record.updated_at,
                synced: true,
                server_id: Some(record.id.clone()),
                deleted: false,
            }),
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
