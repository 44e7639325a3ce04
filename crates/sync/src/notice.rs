// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User-visible notices published by the engine.

use pantry_core::{FailedChange, Recovery};
use std::fmt;
use std::path::PathBuf;

/// Something the user should hear about, published on the engine's
/// broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A change will not be retried automatically.
    ChangeFailed(FailedChange),
    /// The local store was unreadable and has been rebuilt empty.
    DataLoss {
        reason: String,
        backup: PathBuf,
        lost_changes: Option<usize>,
    },
}

impl From<Recovery> for Notice {
    fn from(recovery: Recovery) -> Self {
        Notice::DataLoss {
            reason: recovery.reason,
            backup: recovery.backup,
            lost_changes: recovery.lost_changes,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ChangeFailed(change) => write!(
                f,
                "{} of {} {} failed ({}): {}",
                change.kind, change.collection, change.entity_id, change.cause, change.reason
            ),
            Notice::DataLoss {
                backup,
                lost_changes,
                ..
            } => {
                write!(f, "local data was unreadable and has been reset")?;
                if let Some(n) = lost_changes {
                    write!(f, "; {n} unsent change(s) lost")?;
                }
                write!(f, " (old file kept at {})", backup.display())
            }
        }
    }
}

#[cfg(test)]
#[path = "notice_tests.rs"]
mod tests;
