// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through cache of server reference data.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::{fmt_ts, parse_timestamp, parse_timestamp_opt, Store};
use crate::error::{Error, Result};

/// One cached reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub key: String,
    pub value: Value,
    pub fetched_at: DateTime<Utc>,
    /// `None` means the value never goes stale.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ReferenceEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

impl Store {
    /// Cached value for a key, fresh or not.
    pub fn reference(&self, key: &str) -> Result<Option<ReferenceEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT key, value, fetched_at, expires_at FROM reference_cache WHERE key = ?1",
                params![key],
                |row| {
                    let fetched: String = row.get(2)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        parse_timestamp(&fetched, "fetched_at")?,
                        parse_timestamp_opt(row.get(3)?, "expires_at")?,
                    ))
                },
            )
            .optional()?;

        let Some((key, value, fetched_at, expires_at)) = row else {
            return Ok(None);
        };
        let value = serde_json::from_str(&value)
            .map_err(|e| Error::CorruptedData(format!("reference '{key}': {e}")))?;
        Ok(Some(ReferenceEntry {
            key,
            value,
            fetched_at,
            expires_at,
        }))
    }

    /// Store a freshly fetched value, replacing any previous one.
    pub fn put_reference(
        &self,
        key: &str,
        value: &Value,
        fetched_at: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Result<ReferenceEntry> {
        let expires_at = ttl.and_then(|ttl| fetched_at.checked_add_signed(ttl));
        self.conn.execute(
            "INSERT INTO reference_cache (key, value, fetched_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                fetched_at = excluded.fetched_at,
                expires_at = excluded.expires_at",
            params![
                key,
                serde_json::to_string(value)?,
                fmt_ts(fetched_at),
                expires_at.map(fmt_ts),
            ],
        )?;
        Ok(ReferenceEntry {
            key: key.to_string(),
            value: value.clone(),
            fetched_at,
            expires_at,
        })
    }

    /// Drop entries that went stale before `now`.
    pub fn evict_expired_references(&self, now: DateTime<Utc>) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM reference_cache WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![fmt_ts(now)],
        )?;
        Ok(n)
    }
}

#[cfg(test)]
#[path = "reference_tests.rs"]
mod tests;
