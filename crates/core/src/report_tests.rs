// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn default_report_is_clean() {
    let report = SyncReport::default();
    assert!(report.is_clean());
    assert_eq!(report.to_string(), "pushed 0, pulled 0, conflicts 0, failed 0, deferred 0, held 0, errors 0");
}

#[test]
fn failed_changes_make_report_unclean() {
    let report = SyncReport { failed: 1, ..SyncReport::default() };
    assert!(!report.is_clean());
}

#[test]
fn issue_display_includes_context() {
    let issue = SyncIssue::new(SyncPhase::Push, "timed out")
        .with_collection("shopping")
        .with_change(12);
    assert_eq!(issue.to_string(), "[push] shopping change 12: timed out");
}

#[test]
fn report_serializes_camel_case() {
    let mut report = SyncReport { pushed: 2, ..SyncReport::default() };
    report.record(SyncIssue::new(SyncPhase::Pull, "503").with_collection("pantry"));

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["pushed"], 2);
    assert_eq!(value["errors"][0]["phase"], "pull");
    assert!(value["errors"][0].get("changeId").is_none());

    let back: SyncReport = serde_json::from_value(value).unwrap();
    assert_eq!(back, report);
}
