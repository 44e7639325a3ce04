// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Inspecting and resolving queued changes.

use pantry_sync::SyncEngine;

use super::print_json;
use crate::cli::OutputFormat;
use crate::display::{format_failed, format_pending};
use crate::error::Result;

pub async fn pending(engine: &SyncEngine, output: OutputFormat) -> Result<()> {
    let changes = engine.pending().await?;
    match output {
        OutputFormat::Json => print_json(&changes)?,
        OutputFormat::Text if changes.is_empty() => println!("No pending changes"),
        OutputFormat::Text => {
            for change in &changes {
                println!("{}", format_pending(change));
            }
        }
    }
    Ok(())
}

pub async fn failed(engine: &SyncEngine, output: OutputFormat) -> Result<()> {
    let changes = engine.failed().await?;
    match output {
        OutputFormat::Json => print_json(&changes)?,
        OutputFormat::Text if changes.is_empty() => println!("No failed changes"),
        OutputFormat::Text => {
            for change in &changes {
                println!("{}", format_failed(change));
            }
        }
    }
    Ok(())
}

pub async fn retry(engine: &SyncEngine, id: i64) -> Result<()> {
    let change = engine.retry_failed(id).await?;
    println!(
        "Requeued {} of {} as #{}",
        change.kind, change.entity_id, change.id
    );
    Ok(())
}

pub async fn discard(engine: &SyncEngine, id: i64) -> Result<()> {
    let change = engine.discard_failed(id).await?;
    println!("Discarded #{} ({} of {})", change.id, change.kind, change.entity_id);
    Ok(())
}
