// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;

#[test]
fn last_sync_starts_empty() {
    let store = Store::open_in_memory().unwrap();
    assert!(store.last_sync("shopping").unwrap().is_none());
    assert!(store.sync_metadata().unwrap().is_empty());
}

#[test]
fn set_overwrites_and_clear_forgets() {
    let store = Store::open_in_memory().unwrap();
    let first = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

    store.set_last_sync("shopping", first).unwrap();
    store.set_last_sync("shopping", second).unwrap();
    store.set_last_sync("pantry", first).unwrap();

    assert_eq!(store.last_sync("shopping").unwrap(), Some(second));
    assert_eq!(
        store.sync_metadata().unwrap(),
        vec![
            SyncMetadata {
                collection: "pantry".into(),
                last_sync_timestamp: first,
            },
            SyncMetadata {
                collection: "shopping".into(),
                last_sync_timestamp: second,
            },
        ]
    );

    assert!(store.clear_last_sync("shopping").unwrap());
    assert!(!store.clear_last_sync("shopping").unwrap());
    assert!(store.last_sync("shopping").unwrap().is_none());
}
