// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project directory management.
//!
//! A project keeps everything in `.pantry/`:
//! - `config.toml`: the engine configuration ([`SyncConfig`])
//! - `pantry.db`: the local store
//!
//! `PANTRY_DIR` points at the directory directly and skips the lookup.

use pantry_sync::SyncConfig;
use std::fs;
use std::path::{Path, PathBuf};

use crate::env;
use crate::error::{Error, Result};

const PANTRY_DIR_NAME: &str = ".pantry";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "pantry.db";

/// Directory `init` creates for a project rooted at `base`.
pub fn target_dir(base: &Path) -> PathBuf {
    env::pantry_dir().unwrap_or_else(|| base.join(PANTRY_DIR_NAME))
}

/// Find the `.pantry` directory for `start`, walking up through its parents.
pub fn find_pantry_dir(start: &Path) -> Result<PathBuf> {
    if let Some(dir) = env::pantry_dir() {
        return if dir.join(CONFIG_FILE_NAME).exists() {
            Ok(dir)
        } else {
            Err(Error::NotInitialized)
        };
    }

    let mut current = Some(start);
    while let Some(path) = current {
        let candidate = path.join(PANTRY_DIR_NAME);
        if candidate.join(CONFIG_FILE_NAME).is_file() {
            return Ok(candidate);
        }
        current = path.parent();
    }
    Err(Error::NotInitialized)
}

/// Create `dir` and write `config` into it.
///
/// Fails if the directory already holds a config.
pub fn init_pantry_dir(dir: &Path, config: &SyncConfig) -> Result<()> {
    if dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(dir.display().to_string()));
    }
    config.validate()?;
    fs::create_dir_all(dir)?;
    save_config(dir, config)
}

pub fn load_config(dir: &Path) -> Result<SyncConfig> {
    let text = fs::read_to_string(dir.join(CONFIG_FILE_NAME))?;
    Ok(SyncConfig::from_toml(&text)?)
}

pub fn save_config(dir: &Path, config: &SyncConfig) -> Result<()> {
    fs::write(dir.join(CONFIG_FILE_NAME), config.to_toml()?)?;
    Ok(())
}

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
