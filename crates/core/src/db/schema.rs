// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned schema of the local store.
//!
//! The store holds independently versioned logical collections. Each one
//! owns its tables and an ordered migration list, and records its version in
//! `schema_versions`. Upgrading one collection runs in its own transaction and
//! never touches the others' tables.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// One schema step for a collection.
#[derive(Debug)]
pub struct Migration {
    pub version: i64,
    pub sql: &'static str,
}

/// A logical collection and its migration history.
#[derive(Debug)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub migrations: &'static [Migration],
}

impl CollectionSchema {
    /// Highest version this build knows how to produce.
    pub fn supported_version(&self) -> i64 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }
}

/// Name of the entity collection.
pub const ENTITIES: &str = "entities";
/// Name of the pending-change queue collection (pending and failed tables).
pub const PENDING_CHANGES: &str = "pending_changes";
/// Name of the reference-data cache collection.
pub const REFERENCE_CACHE: &str = "reference_cache";
/// Name of the sync metadata collection.
pub const SYNC_METADATA: &str = "sync_metadata";
/// Name of the background worker's collection (response caches, tags, lease).
pub const WORKER: &str = "worker";

const VERSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_versions (
    collection TEXT PRIMARY KEY,
    version INTEGER NOT NULL
);
"#;

/// Every collection in upgrade order.
pub const COLLECTIONS: &[CollectionSchema] = &[
    CollectionSchema {
        name: ENTITIES,
        migrations: &[
            Migration {
                version: 1,
                sql: r#"
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    fields TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    server_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_entities_collection ON entities(collection);
CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_server_id
    ON entities(server_id) WHERE server_id IS NOT NULL;
"#,
            },
            // Local tombstones for deletes waiting on the server.
            Migration {
                version: 2,
                sql: "ALTER TABLE entities ADD COLUMN deleted INTEGER NOT NULL DEFAULT 0;",
            },
        ],
    },
    CollectionSchema {
        name: PENDING_CHANGES,
        migrations: &[
            Migration {
                version: 1,
                sql: r#"
CREATE TABLE IF NOT EXISTS pending_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    collection TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueued_at TEXT NOT NULL,
    attempt_count INTEGER NOT NULL DEFAULT 0,
    next_attempt_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_pending_order
    ON pending_changes(collection, enqueued_at, id);
CREATE INDEX IF NOT EXISTS idx_pending_entity ON pending_changes(entity_id);

CREATE TABLE IF NOT EXISTS failed_changes (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    collection TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueued_at TEXT NOT NULL,
    attempt_count INTEGER NOT NULL,
    failed_at TEXT NOT NULL,
    cause TEXT NOT NULL,
    reason TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_failed_entity ON failed_changes(entity_id);
"#,
            },
            Migration {
                version: 2,
                sql: r#"
ALTER TABLE pending_changes ADD COLUMN last_error TEXT;
ALTER TABLE pending_changes ADD COLUMN sent_at TEXT;
"#,
            },
            // Queue order is the sequence number alone.
            Migration {
                version: 3,
                sql: r#"
DROP INDEX IF EXISTS idx_pending_order;
CREATE INDEX IF NOT EXISTS idx_pending_order ON pending_changes(collection, id);
"#,
            },
        ],
    },
    CollectionSchema {
        name: REFERENCE_CACHE,
        migrations: &[Migration {
            version: 1,
            sql: r#"
CREATE TABLE IF NOT EXISTS reference_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    expires_at TEXT
);
"#,
        }],
    },
    CollectionSchema {
        name: SYNC_METADATA,
        migrations: &[Migration {
            version: 1,
            sql: r#"
CREATE TABLE IF NOT EXISTS sync_metadata (
    collection TEXT PRIMARY KEY,
    last_sync_timestamp TEXT NOT NULL
);
"#,
        }],
    },
    CollectionSchema {
        name: WORKER,
        migrations: &[Migration {
            version: 1,
            sql: r#"
CREATE TABLE IF NOT EXISTS response_cache (
    cache_name TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL,
    PRIMARY KEY (cache_name, url)
);

CREATE TABLE IF NOT EXISTS sync_registrations (
    tag TEXT PRIMARY KEY,
    registered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_lease (
    name TEXT PRIMARY KEY,
    holder TEXT NOT NULL,
    acquired_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
"#,
        }],
    },
];

/// Returns the recorded version of a collection, if any.
pub fn schema_version(conn: &Connection, collection: &str) -> Result<Option<i64>> {
    let version = conn
        .query_row(
            "SELECT version FROM schema_versions WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version)
}

/// Brings every collection up to its supported version.
///
/// Fails with [`Error::SchemaTooNew`] if the file was written by a newer
/// build; the caller treats that as a corrupt store.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(VERSIONS_TABLE)?;
    for schema in COLLECTIONS {
        migrate_collection(conn, schema)?;
    }
    Ok(())
}

fn migrate_collection(conn: &Connection, schema: &CollectionSchema) -> Result<()> {
    let current = schema_version(conn, schema.name)?.unwrap_or(0);
    let supported = schema.supported_version();
    if current > supported {
        return Err(Error::SchemaTooNew {
            collection: schema.name.to_string(),
            found: current,
            supported,
        });
    }

    for migration in schema.migrations.iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_versions (collection, version) VALUES (?1, ?2)
             ON CONFLICT(collection) DO UPDATE SET version = excluded.version",
            params![schema.name, migration.version],
        )?;
        tx.commit()?;
        tracing::debug!(collection = schema.name, version = migration.version, "migrated");
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
