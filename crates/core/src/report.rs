// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome of one synchronization cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a cycle an issue was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Acquiring the cross-context sync lease.
    Lock,
    Push,
    Pull,
    /// Local store access failed.
    Store,
}

/// A problem recorded during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    pub phase: SyncPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub message: String,
}

impl SyncIssue {
    pub fn new(phase: SyncPhase, message: impl Into<String>) -> Self {
        SyncIssue { phase, change_id: None, collection: None, message: message.into() }
    }

    pub fn with_change(mut self, change_id: i64) -> Self {
        self.change_id = Some(change_id);
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

impl fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            SyncPhase::Lock => "lock",
            SyncPhase::Push => "push",
            SyncPhase::Pull => "pull",
            SyncPhase::Store => "store",
        };
        write!(f, "[{phase}]")?;
        if let Some(collection) = &self.collection {
            write!(f, " {collection}")?;
        }
        if let Some(id) = self.change_id {
            write!(f, " change {id}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Counters and issues from one `synchronize()` call.
///
/// Every outcome of a cycle lands here; the cycle itself never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Changes acknowledged by the server.
    pub pushed: usize,
    /// Server records applied locally.
    pub pulled: usize,
    /// Server records discarded because the local copy is unsynced.
    pub conflicts: usize,
    /// Changes that became failed changes during this cycle.
    pub failed: usize,
    /// Changes skipped because their backoff deadline has not passed.
    pub deferred: usize,
    /// Changes held behind a failed change of the same entity.
    pub held: usize,
    pub errors: Vec<SyncIssue>,
}

impl SyncReport {
    /// Returns true if nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.failed == 0
    }

    /// Records an issue.
    pub fn record(&mut self, issue: SyncIssue) {
        self.errors.push(issue);
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pushed {}, pulled {}, conflicts {}, failed {}, deferred {}, held {}, errors {}",
            self.pushed,
            self.pulled,
            self.conflicts,
            self.failed,
            self.deferred,
            self.held,
            self.errors.len()
        )
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
