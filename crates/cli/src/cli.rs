// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::help;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

/// Parse a `key=value` field assignment.
///
/// The value is read as JSON when it parses (`qty=2`, `done=true`,
/// `tags=["a"]`, `note=null`) and kept as a plain string otherwise.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field name cannot be empty".to_string());
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "pantry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first shopping list and inventory, synchronized when online")]
#[command(help_template = help::template())]
#[command(before_help = help::commands())]
#[command(styles = help::styles())]
pub struct Cli {
    /// Run as if pantry was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create .pantry/ with a default config
    Init {
        /// Server base URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Add an entity to a collection
    Add {
        #[arg(value_parser = non_empty_string)]
        collection: String,
        /// Fields as key=value
        #[arg(value_parser = parse_assignment)]
        fields: Vec<(String, Value)>,
    },

    /// Update fields of an entity (key=null removes a field)
    Edit {
        id: String,
        #[arg(value_parser = parse_assignment, required = true)]
        fields: Vec<(String, Value)>,
    },

    /// Delete an entity
    Rm { id: String },

    /// List live entities of a collection
    List {
        #[arg(value_parser = non_empty_string)]
        collection: String,
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show changes waiting to be pushed
    Pending {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show changes that will not be retried automatically
    Failed {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Move a failed change back to the queue
    Retry {
        #[arg(value_name = "change-id")]
        id: i64,
    },

    /// Drop a failed change for good
    Discard {
        #[arg(value_name = "change-id")]
        id: i64,
    },

    /// Run one sync cycle against the configured server
    Sync {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show queue counts and the last sync of each collection
    Status {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
