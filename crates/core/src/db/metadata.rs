// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-collection sync markers.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use super::{fmt_ts, parse_timestamp, Store};
use crate::error::Result;

/// Last successful pull of one collection, in server time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub collection: String,
    pub last_sync_timestamp: DateTime<Utc>,
}

impl Store {
    /// Server time of the last successful pull, or `None` for a full pull.
    pub fn last_sync(&self, collection: &str) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT last_sync_timestamp FROM sync_metadata WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            Some(s) => Ok(Some(parse_timestamp(&s, "last_sync_timestamp")?)),
            None => Ok(None),
        }
    }

    pub fn set_last_sync(&self, collection: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_metadata (collection, last_sync_timestamp) VALUES (?1, ?2)
             ON CONFLICT(collection) DO UPDATE SET last_sync_timestamp = excluded.last_sync_timestamp",
            params![collection, fmt_ts(at)],
        )?;
        Ok(())
    }

    /// Forget the marker so the next pull fetches everything.
    pub fn clear_last_sync(&self, collection: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM sync_metadata WHERE collection = ?1",
            params![collection],
        )?;
        Ok(n > 0)
    }

    /// Every recorded marker, by collection name.
    pub fn sync_metadata(&self) -> Result<Vec<SyncMetadata>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, last_sync_timestamp FROM sync_metadata ORDER BY collection",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let at: String = row.get(1)?;
                Ok(SyncMetadata {
                    collection: row.get(0)?,
                    last_sync_timestamp: parse_timestamp(&at, "last_sync_timestamp")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
