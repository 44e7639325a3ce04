// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pantry-core operations.

use thiserror::Error;

/// All possible errors that can occur in pantry-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("pending change not found: {0}")]
    ChangeNotFound(i64),

    #[error("failed change not found: {0}\n  hint: run 'pantry failed' to list failed changes")]
    FailedChangeNotFound(i64),

    #[error("entity {0} is deleted locally and waiting for the server")]
    EntityDeleted(String),

    #[error("invalid change kind: '{0}'\n  hint: valid kinds are: add, update, delete")]
    InvalidChangeKind(String),

    #[error("invalid failure cause: '{0}'")]
    InvalidFailureCause(String),

    #[error(
        "schema of collection '{collection}' is version {found}, newer than supported {supported}"
    )]
    SchemaTooNew {
        collection: String,
        found: i64,
        supported: i64,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for pantry-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
