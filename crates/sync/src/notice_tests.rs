// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::Utc;
use pantry_core::{ChangeKind, FailureCause, Fields};

#[test]
fn change_failed_names_the_change() {
    let notice = Notice::ChangeFailed(FailedChange {
        id: 3,
        kind: ChangeKind::Update,
        collection: "shopping".into(),
        entity_id: "e1".into(),
        payload: Fields::new(),
        enqueued_at: Utc::now(),
        attempt_count: 1,
        failed_at: Utc::now(),
        cause: FailureCause::Rejected { status: 422 },
        reason: "422: qty must be positive".into(),
    });
    assert_eq!(
        notice.to_string(),
        "update of shopping e1 failed (rejected by server (422)): 422: qty must be positive"
    );
}

#[test]
fn data_loss_from_recovery() {
    let notice: Notice = Recovery {
        reason: "corrupted data".into(),
        backup: PathBuf::from("/tmp/pantry.db.corrupt-1"),
        lost_changes: Some(2),
    }
    .into();
    assert_eq!(
        notice.to_string(),
        "local data was unreadable and has been reset; 2 unsent change(s) lost \
         (old file kept at /tmp/pantry.db.corrupt-1)"
    );
}
