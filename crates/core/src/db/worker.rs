// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! State owned by the background worker: named response caches and
//! background-sync registrations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{fmt_ts, parse_timestamp, Store};
use crate::error::{Error, Result};

/// A stored HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl Store {
    /// Store a response under `(cache_name, url)`, replacing any previous one.
    pub fn cache_put(&self, cache_name: &str, url: &str, response: &CachedResponse) -> Result<()> {
        self.conn.execute(
            "INSERT INTO response_cache (cache_name, url, status, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(cache_name, url) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                cache_name,
                url,
                response.status,
                serde_json::to_string(&response.headers)?,
                response.body,
                fmt_ts(response.stored_at),
            ],
        )?;
        Ok(())
    }

    pub fn cache_match(&self, cache_name: &str, url: &str) -> Result<Option<CachedResponse>> {
        let row = self
            .conn
            .query_row(
                "SELECT status, headers, body, stored_at FROM response_cache
                 WHERE cache_name = ?1 AND url = ?2",
                params![cache_name, url],
                |row| {
                    let stored: String = row.get(3)?;
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        parse_timestamp(&stored, "stored_at")?,
                    ))
                },
            )
            .optional()?;

        let Some((status, headers, body, stored_at)) = row else {
            return Ok(None);
        };
        let headers = serde_json::from_str(&headers)
            .map_err(|e| Error::CorruptedData(format!("cached headers for {url}: {e}")))?;
        Ok(Some(CachedResponse {
            status,
            headers,
            body,
            stored_at,
        }))
    }

    /// Names of caches holding at least one response.
    pub fn cache_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT cache_name FROM response_cache ORDER BY cache_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Delete a whole cache. Returns the number of responses removed.
    pub fn cache_delete(&self, cache_name: &str) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM response_cache WHERE cache_name = ?1",
            params![cache_name],
        )?;
        Ok(n)
    }

    /// Register a background-sync tag. Registering twice is a no-op.
    pub fn register_sync_tag(&self, tag: &str, now: DateTime<Utc>) -> Result<bool> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO sync_registrations (tag, registered_at) VALUES (?1, ?2)",
            params![tag, fmt_ts(now)],
        )?;
        Ok(n > 0)
    }

    pub fn unregister_sync_tag(&self, tag: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM sync_registrations WHERE tag = ?1", params![tag])?;
        Ok(n > 0)
    }

    /// Registered tags, oldest first.
    pub fn sync_tags(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM sync_registrations ORDER BY registered_at, tag")?;
        let tags = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tags)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
