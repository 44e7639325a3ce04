// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    entity_not_found = { Error::EntityNotFound("item-1".into()), "item-1" },
    change_not_found = { Error::ChangeNotFound(42), "42" },
    failed_hint = { Error::FailedChangeNotFound(7), "pantry failed" },
    deleted = { Error::EntityDeleted("item-2".into()), "deleted locally" },
    bad_kind = { Error::InvalidChangeKind("upsert".into()), "add, update, delete" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_schema_too_new_display() {
    let err = Error::SchemaTooNew {
        collection: "entities".into(),
        found: 9,
        supported: 1,
    };
    let msg = err.to_string();
    assert!(msg.contains("entities"));
    assert!(msg.contains('9'));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
