// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Test helpers are shared across test binaries; not every file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens on the discard port, so every request fails fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

pub fn pantry() -> Command {
    let mut cmd = cargo_bin_cmd!("pantry");
    cmd.env_remove("PANTRY_DIR").env("NO_COLOR", "1");
    cmd
}

/// Run pantry in `temp`.
pub fn pantry_in(temp: &TempDir) -> Command {
    let mut cmd = pantry();
    cmd.current_dir(temp.path());
    cmd
}

/// An initialized project pointing at a server that is never up.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    pantry_in(&temp)
        .args(["init", "--url", UNREACHABLE_URL])
        .assert()
        .success();
    temp
}

/// Add an entity and return its id.
pub fn add(temp: &TempDir, collection: &str, fields: &[&str]) -> String {
    let output = pantry_in(temp)
        .arg("add")
        .arg(collection)
        .args(fields)
        .output()
        .unwrap();
    assert!(output.status.success(), "add failed: {output:?}");
    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .last()
        .unwrap()
        .to_string()
}

pub fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}
