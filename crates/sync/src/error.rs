// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.

use thiserror::Error;

use crate::transport::TransportError;
use crate::worker::WorkerState;

/// Errors surfaced by the engine's own API.
///
/// `synchronize()` never returns one of these; its outcome lives in the
/// report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] pantry_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker cannot {action} while {state}")]
    InvalidTransition {
        state: WorkerState,
        action: &'static str,
    },

    #[error("failed to precache {asset}: {reason}")]
    InstallFailed { asset: String, reason: String },

    #[error("background worker has stopped")]
    WorkerGone,

    #[error("reference data '{0}' is not cached and the server is unreachable")]
    ReferenceUnavailable(String),
}

/// Result type for sync engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
