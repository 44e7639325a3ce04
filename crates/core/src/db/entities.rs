// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity collections and pull application.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{fmt_ts, parse_fields, parse_timestamp, Store};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::protocol::ServerRecord;
use crate::resolve::{ConflictResolver, Resolution};

const ENTITY_COLUMNS: &str =
    "id, collection, fields, updated_at, synced, server_id, deleted";

fn entity_from_row(row: &Row<'_>) -> std::result::Result<Entity, rusqlite::Error> {
    let fields: String = row.get(2)?;
    let updated: String = row.get(3)?;
    Ok(Entity {
        id: row.get(0)?,
        collection: row.get(1)?,
        fields: parse_fields(&fields, "fields")?,
        updated_at: parse_timestamp(&updated, "updated_at")?,
        synced: row.get(4)?,
        server_id: row.get(5)?,
        deleted: row.get(6)?,
    })
}

pub(super) fn get_entity(conn: &Connection, id: &str) -> Result<Option<Entity>> {
    let entity = conn
        .query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
            params![id],
            entity_from_row,
        )
        .optional()?;
    Ok(entity)
}

pub(super) fn put_entity(conn: &Connection, entity: &Entity) -> Result<()> {
    conn.execute(
        "INSERT INTO entities (id, collection, fields, updated_at, synced, server_id, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            collection = excluded.collection,
            fields = excluded.fields,
            updated_at = excluded.updated_at,
            synced = excluded.synced,
            server_id = excluded.server_id,
            deleted = excluded.deleted",
        params![
            entity.id,
            entity.collection,
            serde_json::to_string(&entity.fields)?,
            fmt_ts(entity.updated_at),
            entity.synced,
            entity.server_id,
            entity.deleted,
        ],
    )?;
    Ok(())
}

pub(super) fn remove_entity(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
    Ok(n > 0)
}

/// Mark an entity settled if nothing unsent still references it.
pub(super) fn settle_if_clean(conn: &Connection, entity_id: &str) -> Result<bool> {
    let n = conn.execute(
        "UPDATE entities SET synced = 1
         WHERE id = ?1
           AND NOT EXISTS (SELECT 1 FROM pending_changes WHERE entity_id = ?1)
           AND NOT EXISTS (SELECT 1 FROM failed_changes WHERE entity_id = ?1)",
        params![entity_id],
    )?;
    Ok(n > 0)
}

/// Result of applying one pulled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullApplied {
    /// Records that changed local state.
    pub applied: usize,
    /// Records discarded because the local copy was unsynced.
    pub conflicts: usize,
}

impl Store {
    /// Get an entity by local id, including local tombstones.
    pub fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        get_entity(&self.conn, id)
    }

    /// Get an entity by local id, failing if it does not exist.
    pub fn entity(&self, id: &str) -> Result<Entity> {
        self.get_entity(id)?
            .ok_or_else(|| Error::EntityNotFound(id.to_string()))
    }

    /// Find the entity a server record refers to.
    pub fn find_by_server_id(&self, server_id: &str) -> Result<Option<Entity>> {
        let entity = self
            .conn
            .query_row(
                &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE server_id = ?1"),
                params![server_id],
                entity_from_row,
            )
            .optional()?;
        Ok(entity)
    }

    /// Match a pulled record to a local entity: by server id, then by the
    /// echoed idempotency key.
    pub fn match_record(&self, record: &ServerRecord) -> Result<Option<Entity>> {
        if let Some(entity) = self.find_by_server_id(&record.id)? {
            return Ok(Some(entity));
        }
        match &record.local_id {
            Some(local_id) => self.get_entity(local_id),
            None => Ok(None),
        }
    }

    /// Live entities of a collection, oldest edit first. Tombstones are hidden.
    pub fn list_entities(&self, collection: &str) -> Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities
             WHERE collection = ?1 AND deleted = 0
             ORDER BY updated_at, id"
        ))?;
        let entities = stmt
            .query_map(params![collection], entity_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Names of collections that hold at least one entity.
    pub fn collections(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT collection FROM entities ORDER BY collection")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Count entities that still have unsent local state.
    pub fn count_unsynced(&self) -> Result<usize> {
        let n: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM entities WHERE synced = 0", [], |row| {
                    row.get(0)
                })?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Apply a pulled batch and advance the collection's last-sync marker.
    ///
    /// Records are resolved in server order against the current local state
    /// and everything is committed in one transaction, so a failure leaves
    /// both the entities and the marker untouched.
    pub fn apply_pull(
        &self,
        collection: &str,
        records: &[ServerRecord],
        resolver: &dyn ConflictResolver,
        server_time: DateTime<Utc>,
    ) -> Result<PullApplied> {
        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = PullApplied::default();

        for record in records {
            let local = self.match_record(record)?;
            let resolution = resolver.resolve(collection, local.as_ref(), record);
            if resolution.is_conflict() {
                outcome.conflicts += 1;
                tracing::debug!(collection, server_id = %record.id, "kept unsynced local copy");
            }
            if resolution.is_applied() {
                outcome.applied += 1;
            }
            match resolution {
                Resolution::Insert(entity) | Resolution::Overwrite(entity) => {
                    put_entity(&tx, &entity)?;
                }
                Resolution::Remove { id } => {
                    remove_entity(&tx, &id)?;
                }
                Resolution::KeepLocal { .. } | Resolution::Ignore => {}
            }
        }

        tx.execute(
            "INSERT INTO sync_metadata (collection, last_sync_timestamp) VALUES (?1, ?2)
             ON CONFLICT(collection) DO UPDATE SET last_sync_timestamp = excluded.last_sync_timestamp",
            params![collection, fmt_ts(server_time)],
        )?;
        tx.commit()?;
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "entities_tests.rs"]
mod tests;
