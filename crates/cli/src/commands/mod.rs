// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod entity;
pub mod init;
pub mod queue;
pub mod sync;

use pantry_core::Fields;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Collect parsed `key=value` pairs; later assignments of a key win.
pub(crate) fn fields_from(assignments: Vec<(String, Value)>) -> Fields {
    assignments.into_iter().collect()
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
