// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent queue of unsent changes.
//!
//! Enqueueing applies the change to the local entity and records it in the
//! same transaction, so the optimistic write and the queue entry can never
//! diverge. Order is FIFO by queue sequence number, never by timestamp, so a
//! clock stepping backwards cannot reorder an entity's edits.
//!
//! Changes leave the queue when acknowledged, or move to `failed_changes`
//! when retries run out or the server rejects them. Failed changes hold
//! back every later change of the same entity until retried or discarded.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::entities::{get_entity, put_entity, remove_entity, settle_if_clean};
use super::{fmt_ts, parse_db, parse_fields, parse_timestamp, parse_timestamp_opt, Store};
use crate::change::{
    ChangeKind, Enqueued, FailOutcome, FailedChange, FailureCause, NewChange, PendingChange,
};
use crate::entity::{merge_fields, strip_reserved, Entity};
use crate::error::{Error, Result};

const PENDING_COLUMNS: &str = "id, kind, collection, entity_id, payload, enqueued_at, \
     attempt_count, next_attempt_at, last_error";

const FAILED_COLUMNS: &str = "id, kind, collection, entity_id, payload, enqueued_at, \
     attempt_count, failed_at, cause, reason";

fn pending_from_row(row: &Row<'_>) -> std::result::Result<PendingChange, rusqlite::Error> {
    let kind: String = row.get(1)?;
    let payload: String = row.get(4)?;
    let enqueued: String = row.get(5)?;
    Ok(PendingChange {
        id: row.get(0)?,
        kind: parse_db(&kind, "kind")?,
        collection: row.get(2)?,
        entity_id: row.get(3)?,
        payload: parse_fields(&payload, "payload")?,
        enqueued_at: parse_timestamp(&enqueued, "enqueued_at")?,
        attempt_count: row.get(6)?,
        next_attempt_at: parse_timestamp_opt(row.get(7)?, "next_attempt_at")?,
        last_error: row.get(8)?,
    })
}

fn failed_from_row(row: &Row<'_>) -> std::result::Result<FailedChange, rusqlite::Error> {
    let kind: String = row.get(1)?;
    let payload: String = row.get(4)?;
    let enqueued: String = row.get(5)?;
    let failed: String = row.get(7)?;
    let cause: String = row.get(8)?;
    Ok(FailedChange {
        id: row.get(0)?,
        kind: parse_db(&kind, "kind")?,
        collection: row.get(2)?,
        entity_id: row.get(3)?,
        payload: parse_fields(&payload, "payload")?,
        enqueued_at: parse_timestamp(&enqueued, "enqueued_at")?,
        attempt_count: row.get(6)?,
        failed_at: parse_timestamp(&failed, "failed_at")?,
        cause: FailureCause::decode(&cause).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                8,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        reason: row.get(9)?,
    })
}

fn get_pending(conn: &Connection, id: i64) -> Result<Option<PendingChange>> {
    let change = conn
        .query_row(
            &format!("SELECT {PENDING_COLUMNS} FROM pending_changes WHERE id = ?1"),
            params![id],
            pending_from_row,
        )
        .optional()?;
    Ok(change)
}

fn get_failed(conn: &Connection, id: i64) -> Result<Option<FailedChange>> {
    let change = conn
        .query_row(
            &format!("SELECT {FAILED_COLUMNS} FROM failed_changes WHERE id = ?1"),
            params![id],
            failed_from_row,
        )
        .optional()?;
    Ok(change)
}

fn pending_for_entity(conn: &Connection, entity_id: &str) -> Result<Vec<PendingChange>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PENDING_COLUMNS} FROM pending_changes
         WHERE entity_id = ?1 ORDER BY id"
    ))?;
    let changes = stmt
        .query_map(params![entity_id], pending_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(changes)
}

fn has_failed(conn: &Connection, entity_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM failed_changes WHERE entity_id = ?1)",
        params![entity_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn insert_pending(
    conn: &Connection,
    change: &NewChange,
    now: DateTime<Utc>,
) -> Result<PendingChange> {
    conn.execute(
        "INSERT INTO pending_changes (kind, collection, entity_id, payload, enqueued_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            change.kind.as_str(),
            change.collection,
            change.entity_id,
            serde_json::to_string(&change.payload)?,
            fmt_ts(now),
        ],
    )?;
    Ok(PendingChange {
        id: conn.last_insert_rowid(),
        kind: change.kind,
        collection: change.collection.clone(),
        entity_id: change.entity_id.clone(),
        payload: change.payload.clone(),
        enqueued_at: now,
        attempt_count: 0,
        next_attempt_at: None,
        last_error: None,
    })
}

/// The entity's Add, if it is queued and has never been handed to the
/// transport. Only such an Add may absorb later edits or be cancelled.
fn unsent_add(conn: &Connection, entity_id: &str) -> Result<Option<PendingChange>> {
    let change = conn
        .query_row(
            &format!(
                "SELECT {PENDING_COLUMNS}, sent_at FROM pending_changes
                 WHERE entity_id = ?1 ORDER BY id LIMIT 1"
            ),
            params![entity_id],
            |row| {
                let sent_at: Option<String> = row.get(9)?;
                Ok((pending_from_row(row)?, sent_at))
            },
        )
        .optional()?;
    Ok(change.and_then(|(change, sent_at)| {
        (change.kind == ChangeKind::Add && sent_at.is_none()).then_some(change)
    }))
}

fn move_to_failed(
    conn: &Connection,
    change: &PendingChange,
    attempt_count: u32,
    cause: FailureCause,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<FailedChange> {
    let failed = FailedChange {
        id: change.id,
        kind: change.kind,
        collection: change.collection.clone(),
        entity_id: change.entity_id.clone(),
        payload: change.payload.clone(),
        enqueued_at: change.enqueued_at,
        attempt_count,
        failed_at: now,
        cause,
        reason: reason.to_string(),
    };
    conn.execute(
        "INSERT INTO failed_changes (id, kind, collection, entity_id, payload, enqueued_at,
         attempt_count, failed_at, cause, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            failed.id,
            failed.kind.as_str(),
            failed.collection,
            failed.entity_id,
            serde_json::to_string(&failed.payload)?,
            fmt_ts(failed.enqueued_at),
            failed.attempt_count,
            fmt_ts(failed.failed_at),
            failed.cause.encode(),
            failed.reason,
        ],
    )?;
    conn.execute("DELETE FROM pending_changes WHERE id = ?1", params![change.id])?;
    Ok(failed)
}

impl Store {
    /// Apply a change to local state and queue it for the server.
    ///
    /// - Add: creates the entity unsynced. The entity must not already exist.
    /// - Update: merges the patch into the entity. If the entity's Add has
    ///   never been sent, the patch is folded into it instead of queued.
    /// - Delete: tombstones the entity. If its Add has never been sent, the
    ///   entity and its queued changes are dropped and nothing is queued.
    pub fn enqueue(&self, change: NewChange, now: DateTime<Utc>) -> Result<Enqueued> {
        if change.collection.trim().is_empty() {
            return Err(Error::InvalidInput("collection name cannot be empty".to_string()));
        }
        let change = NewChange {
            payload: strip_reserved(change.payload),
            ..change
        };

        let tx = self.conn.unchecked_transaction()?;
        let outcome = match change.kind {
            ChangeKind::Add => {
                if get_entity(&tx, &change.entity_id)?.is_some() {
                    return Err(Error::InvalidInput(format!(
                        "entity {} already exists",
                        change.entity_id
                    )));
                }
                let entity = Entity {
                    id: change.entity_id.clone(),
                    collection: change.collection.clone(),
                    fields: change.payload.clone(),
                    updated_at: now,
                    synced: false,
                    server_id: None,
                    deleted: false,
                };
                put_entity(&tx, &entity)?;
                Enqueued::Queued(insert_pending(&tx, &change, now)?)
            }
            ChangeKind::Update => {
                let mut entity = self.live_entity(&change)?;
                entity.merge_fields(&change.payload);
                entity.updated_at = now;
                entity.synced = false;
                put_entity(&tx, &entity)?;

                match unsent_add(&tx, &change.entity_id)? {
                    Some(add) => {
                        let mut payload = add.payload.clone();
                        merge_fields(&mut payload, &change.payload);
                        tx.execute(
                            "UPDATE pending_changes SET payload = ?2 WHERE id = ?1",
                            params![add.id, serde_json::to_string(&payload)?],
                        )?;
                        Enqueued::Merged { into: add.id }
                    }
                    None => Enqueued::Queued(insert_pending(&tx, &change, now)?),
                }
            }
            ChangeKind::Delete => {
                let mut entity = self.live_entity(&change)?;
                let never_sent = entity.server_id.is_none()
                    && unsent_add(&tx, &change.entity_id)?.is_some()
                    && !has_failed(&tx, &change.entity_id)?;

                if never_sent {
                    tx.execute(
                        "DELETE FROM pending_changes WHERE entity_id = ?1",
                        params![change.entity_id],
                    )?;
                    remove_entity(&tx, &change.entity_id)?;
                    Enqueued::Cancelled {
                        entity_id: change.entity_id.clone(),
                    }
                } else {
                    entity.deleted = true;
                    entity.synced = false;
                    entity.updated_at = now;
                    put_entity(&tx, &entity)?;
                    Enqueued::Queued(insert_pending(&tx, &change, now)?)
                }
            }
        };
        tx.commit()?;

        tracing::debug!(
            kind = %change.kind,
            collection = %change.collection,
            entity_id = %change.entity_id,
            outcome = outcome_label(&outcome),
            "enqueued change"
        );
        Ok(outcome)
    }

    fn live_entity(&self, change: &NewChange) -> Result<Entity> {
        let entity = self.entity(&change.entity_id)?;
        if entity.deleted {
            return Err(Error::EntityDeleted(change.entity_id.clone()));
        }
        if entity.collection != change.collection {
            return Err(Error::InvalidInput(format!(
                "entity {} belongs to collection '{}', not '{}'",
                entity.id, entity.collection, change.collection
            )));
        }
        Ok(entity)
    }

    /// Record that a change is about to be sent.
    ///
    /// From then on the server may hold it, so it is never folded or
    /// cancelled locally.
    pub fn mark_sent(&self, change_id: i64, now: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE pending_changes SET sent_at = COALESCE(sent_at, ?2) WHERE id = ?1",
            params![change_id, fmt_ts(now)],
        )?;
        Ok(())
    }

    /// Get a pending change by id.
    pub fn pending_change(&self, id: i64) -> Result<Option<PendingChange>> {
        get_pending(&self.conn, id)
    }

    /// Pending changes of one collection in FIFO order.
    pub fn list_pending(&self, collection: &str) -> Result<Vec<PendingChange>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PENDING_COLUMNS} FROM pending_changes
             WHERE collection = ?1 ORDER BY id"
        ))?;
        let changes = stmt
            .query_map(params![collection], pending_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(changes)
    }

    /// Every pending change in FIFO order.
    pub fn all_pending(&self) -> Result<Vec<PendingChange>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PENDING_COLUMNS} FROM pending_changes ORDER BY id"
        ))?;
        let changes = stmt
            .query_map([], pending_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(changes)
    }

    /// Collections with at least one pending change.
    pub fn pending_collections(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT collection FROM pending_changes ORDER BY collection")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Earliest backoff deadline strictly after `now`.
    ///
    /// Deadlines already passed are left out: those changes are due and go
    /// out with the next cycle, or are held behind a failed change.
    pub fn next_retry_at(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self.conn.query_row(
            "SELECT MIN(next_attempt_at) FROM pending_changes WHERE next_attempt_at > ?1",
            params![fmt_ts(now)],
            |row| row.get(0),
        )?;
        Ok(parse_timestamp_opt(value, "next_attempt_at")?)
    }

    pub fn pending_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pending_changes", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Returns true if the entity has a change parked in the failed queue.
    pub fn has_failed_for_entity(&self, entity_id: &str) -> Result<bool> {
        has_failed(&self.conn, entity_id)
    }

    /// Remove an acknowledged change.
    ///
    /// Records the server id the server assigned (first ack wins), removes a
    /// deleted entity, and settles the entity once nothing else is queued for
    /// it. Later changes of the same entity get a fresh backoff. Acking an
    /// id that is no longer queued is a no-op and returns false.
    pub fn ack(&self, change_id: i64, server_id: Option<&str>) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(change) = get_pending(&tx, change_id)? else {
            return Ok(false);
        };
        tx.execute("DELETE FROM pending_changes WHERE id = ?1", params![change_id])?;

        match change.kind {
            ChangeKind::Delete => {
                remove_entity(&tx, &change.entity_id)?;
            }
            ChangeKind::Add | ChangeKind::Update => {
                if let Some(server_id) = server_id {
                    tx.execute(
                        "UPDATE OR IGNORE entities SET server_id = ?2
                         WHERE id = ?1 AND server_id IS NULL",
                        params![change.entity_id, server_id],
                    )?;
                }
                settle_if_clean(&tx, &change.entity_id)?;
            }
        }

        tx.execute(
            "UPDATE pending_changes SET attempt_count = 0, next_attempt_at = NULL
             WHERE entity_id = ?1",
            params![change.entity_id],
        )?;
        tx.commit()?;

        tracing::debug!(change_id, entity_id = %change.entity_id, "change acknowledged");
        Ok(true)
    }

    /// Record a transient failure.
    ///
    /// Increments the attempt count. Once it reaches `max_attempts` the
    /// change is moved to the failed queue.
    pub fn fail(
        &self,
        change_id: i64,
        reason: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<FailOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let change = get_pending(&tx, change_id)?.ok_or(Error::ChangeNotFound(change_id))?;
        let attempt_count = change.attempt_count.saturating_add(1);

        let outcome = if attempt_count >= max_attempts {
            FailOutcome::Escalated(move_to_failed(
                &tx,
                &change,
                attempt_count,
                FailureCause::Exhausted,
                reason,
                now,
            )?)
        } else {
            tx.execute(
                "UPDATE pending_changes SET attempt_count = ?2, last_error = ?3 WHERE id = ?1",
                params![change_id, attempt_count, reason],
            )?;
            FailOutcome::Pending(PendingChange {
                attempt_count,
                last_error: Some(reason.to_string()),
                ..change
            })
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Set the earliest time a pending change may be pushed again.
    pub fn schedule_retry(&self, change_id: i64, at: DateTime<Utc>) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE pending_changes SET next_attempt_at = ?2 WHERE id = ?1",
            params![change_id, fmt_ts(at)],
        )?;
        if n == 0 {
            return Err(Error::ChangeNotFound(change_id));
        }
        Ok(())
    }

    /// Move a change the server refused to the failed queue, without retrying.
    pub fn reject(
        &self,
        change_id: i64,
        status: u16,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<FailedChange> {
        let tx = self.conn.unchecked_transaction()?;
        let change = get_pending(&tx, change_id)?.ok_or(Error::ChangeNotFound(change_id))?;
        let attempt_count = change.attempt_count.saturating_add(1);
        let failed = move_to_failed(
            &tx,
            &change,
            attempt_count,
            FailureCause::Rejected { status },
            reason,
            now,
        )?;
        tx.commit()?;
        tracing::error!(change_id, status, entity_id = %failed.entity_id, "change rejected: {reason}");
        Ok(failed)
    }

    /// Get a failed change by id.
    pub fn failed_change(&self, id: i64) -> Result<Option<FailedChange>> {
        get_failed(&self.conn, id)
    }

    /// Every failed change, oldest first.
    pub fn failed_changes(&self) -> Result<Vec<FailedChange>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FAILED_COLUMNS} FROM failed_changes ORDER BY id"
        ))?;
        let changes = stmt
            .query_map([], failed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(changes)
    }

    pub fn failed_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM failed_changes", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Put a failed change back in the queue with a fresh attempt budget.
    ///
    /// It keeps its sequence number, so it goes out ahead of the entity's
    /// later changes.
    pub fn retry_failed(&self, id: i64) -> Result<PendingChange> {
        let tx = self.conn.unchecked_transaction()?;
        let failed = get_failed(&tx, id)?.ok_or(Error::FailedChangeNotFound(id))?;
        tx.execute(
            "INSERT INTO pending_changes (id, kind, collection, entity_id, payload, enqueued_at,
             attempt_count, next_attempt_at, last_error, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?8)",
            params![
                failed.id,
                failed.kind.as_str(),
                failed.collection,
                failed.entity_id,
                serde_json::to_string(&failed.payload)?,
                fmt_ts(failed.enqueued_at),
                failed.reason,
                fmt_ts(failed.failed_at),
            ],
        )?;
        tx.execute("DELETE FROM failed_changes WHERE id = ?1", params![id])?;
        let change = get_pending(&tx, id)?.ok_or(Error::ChangeNotFound(id))?;
        tx.commit()?;

        tracing::info!(change_id = id, entity_id = %change.entity_id, "failed change requeued");
        Ok(change)
    }

    /// Drop a failed change for good.
    ///
    /// A never-acknowledged Add takes its entity and held changes with it.
    /// Otherwise the local copy is settled and the collection's last-sync
    /// marker is cleared, so the next pull restores the server's version.
    pub fn discard_failed(&self, id: i64) -> Result<FailedChange> {
        let tx = self.conn.unchecked_transaction()?;
        let failed = get_failed(&tx, id)?.ok_or(Error::FailedChangeNotFound(id))?;
        tx.execute("DELETE FROM failed_changes WHERE id = ?1", params![id])?;

        let entity = get_entity(&tx, &failed.entity_id)?;
        let orphan_add = failed.kind == ChangeKind::Add
            && entity.as_ref().is_some_and(|e| e.server_id.is_none());

        if orphan_add {
            tx.execute(
                "DELETE FROM pending_changes WHERE entity_id = ?1",
                params![failed.entity_id],
            )?;
            tx.execute(
                "DELETE FROM failed_changes WHERE entity_id = ?1",
                params![failed.entity_id],
            )?;
            remove_entity(&tx, &failed.entity_id)?;
        } else {
            if let Some(mut entity) = entity {
                let clean = pending_for_entity(&tx, &entity.id)?.is_empty()
                    && !has_failed(&tx, &entity.id)?;
                if clean {
                    entity.deleted = false;
                    entity.synced = true;
                    put_entity(&tx, &entity)?;
                }
            }
            tx.execute(
                "DELETE FROM sync_metadata WHERE collection = ?1",
                params![failed.collection],
            )?;
        }
        tx.commit()?;

        tracing::info!(change_id = id, entity_id = %failed.entity_id, "failed change discarded");
        Ok(failed)
    }
}

fn outcome_label(outcome: &Enqueued) -> &'static str {
    match outcome {
        Enqueued::Queued(_) => "queued",
        Enqueued::Merged { .. } => "merged",
        Enqueued::Cancelled { .. } => "cancelled",
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
