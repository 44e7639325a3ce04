// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use pantry_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Collections to push and pull, in order.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
    /// Lifetime of the cross-process sync lease (seconds).
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    /// How long connectivity must be stable before a sync fires (milliseconds).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How long fetched reference data stays fresh (seconds). 0 = forever.
    #[serde(default = "default_reference_ttl_secs")]
    pub reference_ttl_secs: u64,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Where the server lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on any single push or pull call (milliseconds).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Background worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Cache names are `{cache_prefix}-v{cache_version}`.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,
    /// App shell paths fetched into the cache on install.
    #[serde(default = "default_shell_assets")]
    pub shell_assets: Vec<String>,
    /// Page served to navigations that cannot be satisfied.
    #[serde(default = "default_offline_url")]
    pub offline_url: Option<String>,
    /// Paths that are never cached.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,
    /// Background-sync tag that triggers a sync cycle.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

fn default_collections() -> Vec<String> {
    vec!["shopping".to_string(), "inventory".to_string()]
}

fn default_lock_ttl_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    1_500
}

fn default_reference_ttl_secs() -> u64 {
    3_600
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_cache_prefix() -> String {
    "pantry-shell".to_string()
}

fn default_cache_version() -> u32 {
    1
}

fn default_shell_assets() -> Vec<String> {
    ["/", "/index.html", "/app.js", "/app.css", "/offline.html"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_offline_url() -> Option<String> {
    Some("/offline.html".to_string())
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/sync".to_string(), "/reference".to_string()]
}

fn default_sync_tag() -> String {
    "pantry-sync".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            endpoint: EndpointConfig::default(),
            retry: RetryPolicy::default(),
            collections: default_collections(),
            lock_ttl_secs: default_lock_ttl_secs(),
            debounce_ms: default_debounce_ms(),
            reference_ttl_secs: default_reference_ttl_secs(),
            worker: WorkerConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            shell_assets: default_shell_assets(),
            offline_url: default_offline_url(),
            bypass_prefixes: default_bypass_prefixes(),
            sync_tag: default_sync_tag(),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = &self.endpoint.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "endpoint.base_url must start with http:// or https://, got '{url}'"
            )));
        }
        if self.collections.is_empty() {
            return Err(Error::Config("at least one collection is required".into()));
        }
        if let Some(name) = self.collections.iter().find(|c| c.trim().is_empty()) {
            return Err(Error::Config(format!("invalid collection name '{name}'")));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(Error::Config("retry.jitter must be between 0 and 1".into()));
        }
        if self.endpoint.request_timeout_ms == 0 {
            return Err(Error::Config("endpoint.request_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.endpoint.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.endpoint.connect_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn lock_ttl(&self) -> chrono::Duration {
        i64::try_from(self.lock_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// `None` when reference data never goes stale.
    pub fn reference_ttl(&self) -> Option<chrono::Duration> {
        match self.reference_ttl_secs {
            0 => None,
            secs => i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds),
        }
    }
}

impl WorkerConfig {
    /// Name of the cache owned by this worker version.
    pub fn cache_name(&self) -> String {
        format!("{}-v{}", self.cache_prefix, self.cache_version)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
