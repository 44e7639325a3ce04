// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pantry-core: local data model of the pantry sync engine
//!
//! This crate provides the entity and change types, the SQLite store with its
//! persistent change queue, conflict resolution, retry scheduling and the
//! wire types shared with the server. It performs no network I/O.

pub mod change;
pub mod clock;
pub mod db;
pub mod entity;
pub mod error;
pub mod protocol;
pub mod report;
pub mod resolve;
pub mod retry;

pub use change::{
    ChangeKind, Enqueued, FailOutcome, FailedChange, FailureCause, NewChange, PendingChange,
};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use db::{Recovery, Store};
pub use entity::{Entity, Fields};
pub use error::{Error, Result};
pub use protocol::{
    NotificationData, NotificationPayload, PullResponse, PushAck, PushRequest, ServerRecord,
    WorkerMessage,
};
pub use report::{SyncIssue, SyncPhase, SyncReport};
pub use resolve::{ConflictResolver, Resolution, UnsyncedLocalWins};
pub use retry::{RetryDecision, RetryPolicy, RetryScheduler};
