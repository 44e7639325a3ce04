// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use clap::CommandFactory;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    number = { "qty=2", "qty", json!(2) },
    float = { "price=1.5", "price", json!(1.5) },
    boolean = { "done=true", "done", json!(true) },
    null = { "note=null", "note", json!(null) },
    array = { r#"tags=["a","b"]"#, "tags", json!(["a", "b"]) },
    word = { "name=Lait", "name", json!("Lait") },
    spaces = { "name=Pain de mie", "name", json!("Pain de mie") },
    empty_value = { "note=", "note", json!("") },
    equals_in_value = { "expr=a=b", "expr", json!("a=b") },
    quoted = { r#"code="42""#, "code", json!("42") },
)]
fn test_parse_assignment(input: &str, key: &str, value: Value) {
    assert_eq!(parse_assignment(input).unwrap(), (key.to_string(), value));
}

#[parameterized(
    no_equals = { "qty" },
    empty_key = { "=2" },
    blank_key = { "  =2" },
)]
fn test_parse_assignment_rejects(input: &str) {
    assert!(parse_assignment(input).is_err());
}

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_add_with_fields() {
    let cli = Cli::try_parse_from(["pantry", "add", "shopping", "name=Lait", "qty=2"]).unwrap();
    match cli.command {
        Command::Add { collection, fields } => {
            assert_eq!(collection, "shopping");
            assert_eq!(
                fields,
                vec![("name".to_string(), json!("Lait")), ("qty".to_string(), json!(2))]
            );
        }
        _ => unreachable!("expected add"),
    }
}

#[test]
fn test_edit_requires_a_field() {
    assert!(Cli::try_parse_from(["pantry", "edit", "abc"]).is_err());
}

#[test]
fn test_change_id_must_be_numeric() {
    assert!(Cli::try_parse_from(["pantry", "retry", "abc"]).is_err());
    assert!(Cli::try_parse_from(["pantry", "discard", "12"]).is_ok());
}

#[test]
fn test_directory_is_global() {
    let cli = Cli::try_parse_from(["pantry", "status", "-C", "/tmp/p", "-o", "json"]).unwrap();
    assert_eq!(cli.directory.as_deref(), Some("/tmp/p"));
    assert!(matches!(
        cli.command,
        Command::Status {
            output: OutputFormat::Json
        }
    ));
}
