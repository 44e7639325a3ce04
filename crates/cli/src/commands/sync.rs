// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use pantry_sync::SyncEngine;

use super::print_json;
use crate::cli::OutputFormat;
use crate::display::{format_report, format_status};
use crate::error::{Error, Result};

/// One cycle. The report is printed either way; an unclean one fails the
/// command.
pub async fn sync(engine: &SyncEngine, output: OutputFormat) -> Result<()> {
    let report = engine.synchronize().await;
    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => println!("{}", format_report(&report)),
    }
    if report.is_clean() {
        Ok(())
    } else {
        Err(Error::SyncIncomplete(report.errors.len() + report.failed))
    }
}

pub async fn status(engine: &SyncEngine, output: OutputFormat) -> Result<()> {
    let status = engine.status().await?;
    match output {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Text => println!("{}", format_status(&status)),
    }
    Ok(())
}
