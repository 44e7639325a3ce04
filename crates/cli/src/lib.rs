// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pantry_cli - command line front end of the pantry sync engine.
//!
//! Each invocation opens the project's store from `.pantry/`, performs one
//! command and exits. Local edits are applied and queued immediately;
//! nothing reaches the server until `pantry sync`.

mod cli;
pub mod colors;
mod commands;
mod display;
pub mod help;

pub mod config;
pub mod env;
pub mod error;

pub use cli::{parse_assignment, Cli, Command, OutputFormat};
pub use error::{Error, Result};

use pantry_sync::{HttpTransport, Notice, SyncConfig, SyncEngine, Transport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let base = match cli.directory {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    if let Command::Init { url } = cli.command {
        return commands::init::run(&base, url);
    }

    let dir = config::find_pantry_dir(&base)?;
    let sync_config = config::load_config(&dir)?;
    let db_path = config::db_path(&dir);
    tracing::debug!(path = %db_path.display(), "opening store");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(&db_path, sync_config, cli.command))
}

async fn execute(db_path: &Path, sync_config: SyncConfig, command: Command) -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&sync_config.endpoint)?);
    let (engine, mut notices) = SyncEngine::open(db_path, transport, sync_config)?;
    report_notices(&mut notices);
    let result = dispatch(&engine, command).await;
    report_notices(&mut notices);
    result
}

async fn dispatch(engine: &SyncEngine, command: Command) -> Result<()> {
    match command {
        Command::Init { .. } => Ok(()),
        Command::Add { collection, fields } => {
            commands::entity::add(engine, &collection, fields).await
        }
        Command::Edit { id, fields } => commands::entity::edit(engine, &id, fields).await,
        Command::Rm { id } => commands::entity::remove(engine, &id).await,
        Command::List { collection, output } => {
            commands::entity::list(engine, &collection, output).await
        }
        Command::Pending { output } => commands::queue::pending(engine, output).await,
        Command::Failed { output } => commands::queue::failed(engine, output).await,
        Command::Retry { id } => commands::queue::retry(engine, id).await,
        Command::Discard { id } => commands::queue::discard(engine, id).await,
        Command::Sync { output } => commands::sync::sync(engine, output).await,
        Command::Status { output } => commands::sync::status(engine, output).await,
    }
}

/// Print every notice published so far to stderr.
fn report_notices(notices: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        eprintln!("warning: {notice}");
    }
}
