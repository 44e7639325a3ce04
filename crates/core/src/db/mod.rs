// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local store.
//!
//! One file holds the entity collections, the pending-change queue, the
//! reference-data cache, sync metadata and the background worker's state.
//! Operations are split across submodules as separate `impl Store` blocks.

mod entities;
mod lease;
mod metadata;
mod queue;
mod reference;
pub mod schema;
mod worker;

pub use entities::PullApplied;
pub use lease::SyncLease;
pub use metadata::SyncMetadata;
pub use reference::ReferenceEntry;
pub use worker::CachedResponse;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::entity::Fields;
use crate::error::{Error, Result};

/// Format a timestamp for storage.
///
/// Fixed-width UTC so that stored values order lexicographically.
pub(crate) fn fmt_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|s| parse_timestamp(&s, column)).transpose()
}

/// Parse a JSON object column.
fn parse_fields(value: &str, column: &str) -> std::result::Result<Fields, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!("invalid JSON in column '{column}': {e}"))),
        )
    })
}

/// What [`Store::open_or_rebuild`] had to do to a store it could not read.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    /// Why the old file was rejected.
    pub reason: String,
    /// Where the old file was moved.
    pub backup: PathBuf,
    /// Unsent changes lost with the old file, when they could still be counted.
    pub lost_changes: Option<usize>,
}

/// SQLite connection with the sync engine's local operations.
///
/// The connection stays private so every write goes through the
/// transactional operations below.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open the store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let check: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if check != "ok" {
            return Err(Error::CorruptedData(format!("integrity check failed: {check}")));
        }

        let store = Store { conn };
        schema::run_migrations(&store.conn)?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Store { conn };
        schema::run_migrations(&store.conn)?;
        Ok(store)
    }

    /// Open the store, rebuilding it from scratch if the file is unreadable.
    ///
    /// A corrupt file (or one written by a newer schema) is moved aside to
    /// `<path>.corrupt-<unix-ms>` and an empty store is created in its place.
    /// Any other failure is returned as-is.
    pub fn open_or_rebuild(path: &Path, now: DateTime<Utc>) -> Result<(Self, Option<Recovery>)> {
        let err = match Store::open(path) {
            Ok(store) => return Ok((store, None)),
            Err(e) if is_corruption(&e) => e,
            Err(e) => return Err(e),
        };

        let lost_changes = count_unsent(path);
        let backup = quarantine(path, now)?;
        tracing::error!(
            path = %path.display(),
            backup = %backup.display(),
            lost_changes = ?lost_changes,
            "local store unreadable, rebuilding: {err}"
        );

        let store = Store::open(path)?;
        Ok((
            store,
            Some(Recovery {
                reason: err.to_string(),
                backup,
                lost_changes,
            }),
        ))
    }
}

/// Returns true for errors that mean the file itself cannot be trusted.
pub fn is_corruption(err: &Error) -> bool {
    match err {
        Error::CorruptedData(_) | Error::SchemaTooNew { .. } => true,
        Error::Database(e) => matches!(
            e.sqlite_error_code(),
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase)
        ),
        _ => false,
    }
}

/// Best-effort count of pending and failed changes in an unreadable store.
fn count_unsent(path: &Path) -> Option<usize> {
    let conn = Connection::open(path).ok()?;
    let count = |table: &str| -> Option<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .ok()
    };
    let total = count("pending_changes")? + count("failed_changes").unwrap_or(0);
    usize::try_from(total).ok()
}

/// Move a store file and its WAL sidecars out of the way.
fn quarantine(path: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let suffix = format!(".corrupt-{}", now.timestamp_millis());
    let with_suffix = |p: &Path, extra: &str| -> PathBuf {
        let mut name = OsString::from(p.as_os_str());
        name.push(extra);
        name.push(&suffix);
        PathBuf::from(name)
    };

    let backup = with_suffix(path, "");
    std::fs::rename(path, &backup)?;
    for sidecar in ["-wal", "-shm"] {
        let mut name = OsString::from(path.as_os_str());
        name.push(sidecar);
        let sidecar_path = PathBuf::from(name);
        if sidecar_path.exists() {
            std::fs::rename(&sidecar_path, with_suffix(path, sidecar))?;
        }
    }
    Ok(backup)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
