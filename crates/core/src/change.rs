// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations.
//!
//! One [`PendingChange`] is created per logical mutation. It leaves the queue
//! when the server acknowledges it, or it becomes a [`FailedChange`] when it
//! is rejected or runs out of attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entity::Fields;
use crate::error::{Error, Result};

/// Kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

impl ChangeKind {
    /// Returns the string representation used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "add" => Ok(ChangeKind::Add),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            _ => Err(Error::InvalidChangeKind(s.to_string())),
        }
    }
}

/// A mutation about to be enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChange {
    pub kind: ChangeKind,
    pub collection: String,
    pub entity_id: String,
    /// Full fields for an add, the patch for an update, empty for a delete.
    pub payload: Fields,
}

impl NewChange {
    pub fn add(collection: impl Into<String>, entity_id: impl Into<String>, fields: Fields) -> Self {
        NewChange {
            kind: ChangeKind::Add,
            collection: collection.into(),
            entity_id: entity_id.into(),
            payload: fields,
        }
    }

    pub fn update(
        collection: impl Into<String>,
        entity_id: impl Into<String>,
        patch: Fields,
    ) -> Self {
        NewChange {
            kind: ChangeKind::Update,
            collection: collection.into(),
            entity_id: entity_id.into(),
            payload: patch,
        }
    }

    pub fn delete(collection: impl Into<String>, entity_id: impl Into<String>) -> Self {
        NewChange {
            kind: ChangeKind::Delete,
            collection: collection.into(),
            entity_id: entity_id.into(),
            payload: Fields::new(),
        }
    }
}

/// A queued, not yet acknowledged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    /// Queue sequence number; defines FIFO order.
    pub id: i64,
    pub kind: ChangeKind,
    pub collection: String,
    pub entity_id: String,
    pub payload: Fields,
    pub enqueued_at: DateTime<Utc>,
    pub attempt_count: u32,
    /// Backoff deadline; the change is not pushed before it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingChange {
    /// Returns true if the backoff deadline has passed (or none is set).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now)
    }
}

/// Why a change left the retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureCause {
    /// Transient failures hit the attempt ceiling.
    Exhausted,
    /// The server refused the mutation (4xx).
    Rejected { status: u16 },
}

impl FailureCause {
    /// Storage encoding: `exhausted` or `rejected:<status>`.
    pub fn encode(&self) -> String {
        match self {
            FailureCause::Exhausted => "exhausted".to_string(),
            FailureCause::Rejected { status } => format!("rejected:{status}"),
        }
    }

    pub fn decode(s: &str) -> Result<Self> {
        if s == "exhausted" {
            return Ok(FailureCause::Exhausted);
        }
        s.strip_prefix("rejected:")
            .and_then(|status| status.parse().ok())
            .map(|status| FailureCause::Rejected { status })
            .ok_or_else(|| Error::InvalidFailureCause(s.to_string()))
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Exhausted => write!(f, "retries exhausted"),
            FailureCause::Rejected { status } => write!(f, "rejected by server ({status})"),
        }
    }
}

/// A terminal change kept for manual retry or discard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedChange {
    pub id: i64,
    pub kind: ChangeKind,
    pub collection: String,
    pub entity_id: String,
    pub payload: Fields,
    pub enqueued_at: DateTime<Utc>,
    pub attempt_count: u32,
    pub failed_at: DateTime<Utc>,
    pub cause: FailureCause,
    /// Last error message, or the server's rejection reason.
    pub reason: String,
}

/// Result of [`Store::enqueue`](crate::db::Store::enqueue).
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    /// Appended as a new change.
    Queued(PendingChange),
    /// Folded into the pending add with this id.
    Merged { into: i64 },
    /// Cancelled an unsent add; nothing left to push for the entity.
    Cancelled { entity_id: String },
}

/// Result of [`Store::fail`](crate::db::Store::fail).
#[derive(Debug, Clone, PartialEq)]
pub enum FailOutcome {
    /// Still pending; `attempt_count` has been incremented.
    Pending(PendingChange),
    /// Hit the attempt ceiling and moved to the failed set.
    Escalated(FailedChange),
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
