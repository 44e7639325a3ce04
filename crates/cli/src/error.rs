// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `pantry` command line.
///
/// Messages are shown to the user as-is, with a hint where one helps.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'pantry init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("sync incomplete: {0} problem(s)\n  hint: pending changes are kept; run 'pantry failed' to see changes that need attention")]
    SyncIncomplete(usize),

    #[error(transparent)]
    Sync(#[from] pantry_sync::Error),

    #[error(transparent)]
    Store(#[from] pantry_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<pantry_sync::TransportError> for Error {
    fn from(err: pantry_sync::TransportError) -> Self {
        Error::Sync(err.into())
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
