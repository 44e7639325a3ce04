// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use chrono::{Duration, Utc};
use serde_json::json;

fn local(synced: bool) -> Entity {
    let mut e = Entity::new(
        "shopping",
        json!({"name": "Lait", "qty": 1}).as_object().unwrap().clone(),
        Utc::now() - Duration::hours(1),
    );
    e.synced = synced;
    e.server_id = Some("srv-1".into());
    e
}

fn record(deleted: bool) -> ServerRecord {
    ServerRecord {
        id: "srv-1".into(),
        local_id: None,
        collection: None,
        updated_at: Utc::now(),
        deleted,
        fields: json!({"name": "Lait entier", "qty": 4}).as_object().unwrap().clone(),
    }
}

#[test]
fn unsynced_local_wins() {
    let local = local(false);
    let resolution = UnsyncedLocalWins.resolve("shopping", Some(&local), &record(false));
    assert_eq!(resolution, Resolution::KeepLocal { id: local.id.clone() });
    assert!(resolution.is_conflict());
    assert!(!resolution.is_applied());
}

#[test]
fn unsynced_local_wins_over_server_delete() {
    let local = local(false);
    let resolution = UnsyncedLocalWins.resolve("shopping", Some(&local), &record(true));
    assert!(resolution.is_conflict());
}

#[test]
fn settled_local_is_overwritten() {
    let local = local(true);
    let server = record(false);
    let Resolution::Overwrite(entity) = UnsyncedLocalWins.resolve("shopping", Some(&local), &server)
    else {
        panic!("expected overwrite");
    };

    assert_eq!(entity.id, local.id);
    assert_eq!(entity.fields.get("qty"), Some(&json!(4)));
    assert_eq!(entity.updated_at, server.updated_at);
    assert!(entity.synced);
    assert_eq!(entity.server_id.as_deref(), Some("srv-1"));
}

#[test]
fn settled_local_removed_by_server_delete() {
    let local = local(true);
    let resolution = UnsyncedLocalWins.resolve("shopping", Some(&local), &record(true));
    assert_eq!(resolution, Resolution::Remove { id: local.id });
}

#[test]
fn unknown_record_inserted_under_echoed_local_id() {
    let mut server = record(false);
    server.local_id = Some("other-client-id".into());
    let Resolution::Insert(entity) = UnsyncedLocalWins.resolve("shopping", None, &server) else {
        panic!("expected insert");
    };
    assert_eq!(entity.id, "other-client-id");
    assert_eq!(entity.collection, "shopping");
    assert!(entity.synced);
}

#[test]
fn unknown_record_without_local_id_uses_server_id() {
    let Resolution::Insert(entity) = UnsyncedLocalWins.resolve("pantry", None, &record(false))
    else {
        panic!("expected insert");
    };
    assert_eq!(entity.id, "srv-1");
    assert_eq!(entity.collection, "pantry");
}

#[test]
fn unknown_deletion_ignored() {
    assert_eq!(UnsyncedLocalWins.resolve("shopping", None, &record(true)), Resolution::Ignore);
}
