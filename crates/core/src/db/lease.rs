// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process sync lease.
//!
//! Processes sharing one store file take this lease before a sync cycle so
//! that only one of them pushes at a time. A lease whose holder died expires
//! after its TTL and can be taken over.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

use super::{fmt_ts, parse_timestamp, Store};
use crate::error::Result;

/// Current holder of a lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLease {
    pub name: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Store {
    /// Take the lease if it is free, expired, or already ours.
    ///
    /// A single upsert statement, so two processes racing for it cannot both
    /// succeed.
    pub fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool> {
        let n = self.conn.execute(
            "INSERT INTO sync_lease (name, holder, acquired_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at,
                expires_at = excluded.expires_at
             WHERE sync_lease.holder = excluded.holder OR sync_lease.expires_at <= ?3",
            params![name, holder, fmt_ts(now), fmt_ts(expiry(now, ttl))],
        )?;
        Ok(n > 0)
    }

    /// Push the expiry of a held lease forward. Returns false if it was lost.
    pub fn renew_lease(
        &self,
        name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE sync_lease SET expires_at = ?3 WHERE name = ?1 AND holder = ?2",
            params![name, holder, fmt_ts(expiry(now, ttl))],
        )?;
        Ok(n > 0)
    }

    pub fn release_lease(&self, name: &str, holder: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM sync_lease WHERE name = ?1 AND holder = ?2",
            params![name, holder],
        )?;
        Ok(n > 0)
    }

    pub fn lease(&self, name: &str) -> Result<Option<SyncLease>> {
        let lease = self
            .conn
            .query_row(
                "SELECT name, holder, acquired_at, expires_at FROM sync_lease WHERE name = ?1",
                params![name],
                |row| {
                    let acquired: String = row.get(2)?;
                    let expires: String = row.get(3)?;
                    Ok(SyncLease {
                        name: row.get(0)?,
                        holder: row.get(1)?,
                        acquired_at: parse_timestamp(&acquired, "acquired_at")?,
                        expires_at: parse_timestamp(&expires, "expires_at")?,
                    })
                },
            )
            .optional()?;
        Ok(lease)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
