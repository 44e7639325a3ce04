// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;
use serde_json::json;

#[test]
fn offline_sync_reports_and_keeps_changes() {
    let temp = init_temp();
    let id = add(&temp, "shopping", &["name=Lait"]);

    pantry_in(&temp)
        .arg("sync")
        .assert()
        .failure()
        .stdout(predicate::str::contains("pushed 0"))
        .stdout(predicate::str::contains("[push]"))
        .stderr(predicate::str::contains("sync incomplete"));

    let pending = stdout_json(pantry_in(&temp).args(["pending", "-o", "json"]));
    let changes = pending.as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["entityId"], json!(id));
    assert_eq!(changes[0]["attemptCount"], json!(1));
    assert!(changes[0]["lastError"].is_string());

    let list = stdout_json(pantry_in(&temp).args(["list", "shopping", "-o", "json"]));
    assert_eq!(list[0]["fields"], json!({"name": "Lait"}));
}

#[test]
fn sync_json_report() {
    let temp = init_temp();

    let output = pantry_in(&temp).args(["sync", "-o", "json"]).output().unwrap();
    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["pushed"], json!(0));
    assert_eq!(report["pulled"], json!(0));
    assert!(!report["errors"].as_array().unwrap().is_empty());
}

#[test]
fn status_counts() {
    let temp = init_temp();
    add(&temp, "shopping", &["name=Lait"]);
    add(&temp, "inventory", &["name=Riz", "qty=1"]);

    let status = stdout_json(pantry_in(&temp).args(["status", "-o", "json"]));
    assert_eq!(status["pending"], json!(2));
    assert_eq!(status["failed"], json!(0));
    assert_eq!(status["unsynced"], json!(2));
    assert_eq!(status["lastSync"], json!([]));

    pantry_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 2"))
        .stdout(predicate::str::contains("last sync: never"));
}

#[test]
fn unreadable_store_is_rebuilt_with_warning() {
    let temp = init_temp();
    std::fs::write(
        temp.path().join(".pantry/pantry.db"),
        b"this is not a sqlite database, not even close",
    )
    .unwrap();

    pantry_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: local data was unreadable"))
        .stdout(predicate::str::contains("pending: 0"));
}
