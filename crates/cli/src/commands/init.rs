// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use pantry_core::Store;
use pantry_sync::SyncConfig;
use std::path::Path;

use crate::config::{db_path, init_pantry_dir, target_dir};
use crate::error::Result;

pub fn run(base: &Path, url: Option<String>) -> Result<()> {
    let mut config = SyncConfig::default();
    if let Some(url) = url {
        config.endpoint.base_url = url;
    }

    let dir = target_dir(base);
    init_pantry_dir(&dir, &config)?;
    Store::open(&db_path(&dir))?;

    println!("Initialized pantry at {}", dir.display());
    println!("Server: {}", config.endpoint.base_url);
    println!("Collections: {}", config.collections.join(", "));
    Ok(())
}
