// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic entity edits and listing.

use pantry_sync::SyncEngine;
use serde_json::Value;

use super::{fields_from, print_json};
use crate::cli::OutputFormat;
use crate::display::format_entity;
use crate::error::Result;

pub async fn add(
    engine: &SyncEngine,
    collection: &str,
    assignments: Vec<(String, Value)>,
) -> Result<()> {
    let entity = engine.add(collection, fields_from(assignments)).await?;
    println!("Added {} {}", entity.collection, entity.id);
    Ok(())
}

pub async fn edit(engine: &SyncEngine, id: &str, assignments: Vec<(String, Value)>) -> Result<()> {
    let entity = engine.update(id, fields_from(assignments)).await?;
    println!("Updated {}", entity.id);
    Ok(())
}

pub async fn remove(engine: &SyncEngine, id: &str) -> Result<()> {
    engine.delete(id).await?;
    println!("Removed {id}");
    Ok(())
}

pub async fn list(engine: &SyncEngine, collection: &str, output: OutputFormat) -> Result<()> {
    let entities = engine.entities(collection).await?;
    match output {
        OutputFormat::Json => print_json(&entities)?,
        OutputFormat::Text => {
            if entities.is_empty() {
                println!("No entities in {collection}");
            }
            for entity in &entities {
                println!("{}", format_entity(entity));
            }
        }
    }
    Ok(())
}
