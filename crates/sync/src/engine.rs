// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The engine handle shared by the app, the background worker and the CLI.
//!
//! Local mutations apply to the store at once and queue a change; nothing
//! here waits on the network except [`SyncEngine::synchronize`] and
//! [`SyncEngine::reference_data`].

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pantry_core::db::SyncMetadata;
use pantry_core::entity::new_local_id;
use pantry_core::{
    ClockSource, ConflictResolver, Entity, FailedChange, Fields, NewChange, PendingChange,
    Store, SyncReport, SystemClock, UnsyncedLocalWins,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SyncConfig;
use crate::coordinator::SyncCoordinator;
use crate::error::{Error, Result};
use crate::network::{Connectivity, NetworkMonitor, SyncTrigger};
use crate::notice::Notice;
use crate::transport::{Transport, TransportError};

/// Counts shown by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub pending: usize,
    pub failed: usize,
    /// Entities with local state the server has not acknowledged.
    pub unsynced: usize,
    pub last_sync: Vec<SyncMetadata>,
}

/// Shared engine handle. Cheap to clone.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<Mutex<Store>>,
    transport: Arc<dyn Transport>,
    coordinator: SyncCoordinator,
    clock: Arc<dyn ClockSource>,
    config: SyncConfig,
    notices: broadcast::Sender<Notice>,
    /// Signalled after every local mutation.
    mutated: Notify,
    /// Signalled after every cycle, which may have rescheduled retries.
    cycled: Notify,
}

impl SyncEngine {
    pub fn new(store: Store, transport: Arc<dyn Transport>, config: SyncConfig) -> Self {
        Self::with_clock(store, transport, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Store,
        transport: Arc<dyn Transport>,
        config: SyncConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self::from_parts(store, transport, config, clock, Arc::new(UnsyncedLocalWins))
    }

    pub fn from_parts(
        store: Store,
        transport: Arc<dyn Transport>,
        config: SyncConfig,
        clock: Arc<dyn ClockSource>,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        let store = Arc::new(Mutex::new(store));
        let (notices, _) = broadcast::channel(64);
        let coordinator = SyncCoordinator::new(
            store.clone(),
            transport.clone(),
            &config,
            clock.clone(),
            notices.clone(),
        )
        .with_resolver(resolver);

        SyncEngine {
            inner: Arc::new(EngineInner {
                store,
                transport,
                coordinator,
                clock,
                config,
                notices,
                mutated: Notify::new(),
                cycled: Notify::new(),
            }),
        }
    }

    /// Open the store file, rebuilding it if unreadable.
    ///
    /// The returned receiver is subscribed before anything is published, so
    /// it sees the [`Notice::DataLoss`] of a rebuild. A rebuilt store has no
    /// sync markers, so the next cycle pulls every collection in full.
    pub fn open(
        path: &Path,
        transport: Arc<dyn Transport>,
        config: SyncConfig,
    ) -> Result<(Self, broadcast::Receiver<Notice>)> {
        let clock: Arc<dyn ClockSource> = Arc::new(SystemClock);
        let (store, recovery) = Store::open_or_rebuild(path, clock.now())?;
        let engine = Self::with_clock(store, transport, config, clock);
        let notices = engine.subscribe();
        if let Some(recovery) = recovery {
            let _ = engine.inner.notices.send(recovery.into());
        }
        Ok((engine, notices))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn store(&self) -> Arc<Mutex<Store>> {
        self.inner.store.clone()
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Create an entity and queue its add.
    pub async fn add(&self, collection: &str, fields: Fields) -> Result<Entity> {
        let now = self.now();
        let id = new_local_id();
        let entity = {
            let store = self.inner.store.lock().await;
            store.enqueue(NewChange::add(collection, &id, fields), now)?;
            store.entity(&id)?
        };
        self.inner.mutated.notify_one();
        Ok(entity)
    }

    /// Merge a patch into an entity and queue the update.
    pub async fn update(&self, id: &str, patch: Fields) -> Result<Entity> {
        let now = self.now();
        let entity = {
            let store = self.inner.store.lock().await;
            let collection = store.entity(id)?.collection;
            store.enqueue(NewChange::update(collection, id, patch), now)?;
            store.entity(id)?
        };
        self.inner.mutated.notify_one();
        Ok(entity)
    }

    /// Delete an entity and queue the delete.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let now = self.now();
        {
            let store = self.inner.store.lock().await;
            let collection = store.entity(id)?.collection;
            store.enqueue(NewChange::delete(collection, id), now)?;
        }
        self.inner.mutated.notify_one();
        Ok(())
    }

    pub async fn entity(&self, id: &str) -> Result<Entity> {
        Ok(self.inner.store.lock().await.entity(id)?)
    }

    pub async fn entities(&self, collection: &str) -> Result<Vec<Entity>> {
        Ok(self.inner.store.lock().await.list_entities(collection)?)
    }

    pub async fn pending(&self) -> Result<Vec<PendingChange>> {
        Ok(self.inner.store.lock().await.all_pending()?)
    }

    pub async fn failed(&self) -> Result<Vec<FailedChange>> {
        Ok(self.inner.store.lock().await.failed_changes()?)
    }

    /// Put a failed change back on the queue with a fresh attempt budget.
    pub async fn retry_failed(&self, id: i64) -> Result<PendingChange> {
        let change = self.inner.store.lock().await.retry_failed(id)?;
        self.inner.mutated.notify_one();
        Ok(change)
    }

    /// Drop a failed change for good.
    pub async fn discard_failed(&self, id: i64) -> Result<FailedChange> {
        Ok(self.inner.store.lock().await.discard_failed(id)?)
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        let store = self.inner.store.lock().await;
        Ok(EngineStatus {
            pending: store.pending_count()?,
            failed: store.failed_count()?,
            unsynced: store.count_unsynced()?,
            last_sync: store.sync_metadata()?,
        })
    }

    /// Run one synchronize cycle, or join the one in flight.
    pub async fn synchronize(&self) -> SyncReport {
        let report = self.inner.coordinator.synchronize().await;
        self.inner.cycled.notify_one();
        report
    }

    /// Read-through cache for reference data.
    ///
    /// A fresh cached value is returned without a request. Otherwise the
    /// server is asked; if that fails, a stale cached value is still
    /// returned. Only a miss with no server is an error.
    pub async fn reference_data(&self, key: &str) -> Result<Value> {
        let now = self.now();
        let cached = self.inner.store.lock().await.reference(key)?;
        if let Some(entry) = &cached {
            if entry.is_fresh(now) {
                return Ok(entry.value.clone());
            }
        }

        let fetched = tokio::time::timeout(
            self.inner.config.request_timeout(),
            self.inner.transport.fetch_reference(key),
        )
        .await
        .unwrap_or(Err(TransportError::Timeout));

        match (fetched, cached) {
            (Ok(value), _) => {
                let entry = self.inner.store.lock().await.put_reference(
                    key,
                    &value,
                    now,
                    self.inner.config.reference_ttl(),
                )?;
                Ok(entry.value)
            }
            (Err(err), Some(entry)) => {
                tracing::warn!(key, "serving stale reference data: {err}");
                Ok(entry.value)
            }
            (Err(err), None) => {
                tracing::warn!(key, "reference data unavailable: {err}");
                Err(Error::ReferenceUnavailable(key.to_string()))
            }
        }
    }

    /// Drive syncs from connectivity signals until the sender is dropped.
    ///
    /// While online, a cycle runs once the link has been up for the debounce
    /// window, right after each local mutation, and whenever the earliest
    /// retry backoff of a pending change expires.
    pub async fn run_connectivity(&self, mut signals: mpsc::Receiver<Connectivity>) {
        let mut monitor = NetworkMonitor::new(self.inner.config.debounce());
        loop {
            let deadline = monitor.deadline();
            let retry = if monitor.is_online() {
                self.retry_deadline().await
            } else {
                None
            };
            let trigger = tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) => {
                        monitor.handle(signal, Instant::now());
                        None
                    }
                    None => break,
                },
                _ = sleep_until(deadline) => monitor.poll(Instant::now()),
                _ = sleep_until(retry) => monitor.is_online().then_some(SyncTrigger),
                _ = self.inner.mutated.notified() => monitor.on_mutation(),
                _ = self.inner.cycled.notified() => None,
            };

            if trigger.is_some() {
                let report = self.synchronize().await;
                tracing::debug!(%report, "connectivity-triggered sync done");
            }
        }
        tracing::debug!("connectivity signals closed");
    }

    /// When the next scheduled retry falls due, on the runtime's clock.
    async fn retry_deadline(&self) -> Option<Instant> {
        let now = self.now();
        let at = match self.inner.store.lock().await.next_retry_at(now) {
            Ok(at) => at?,
            Err(e) => {
                tracing::warn!("cannot read retry schedule: {e}");
                return None;
            }
        };
        let wait = (at - now).to_std().unwrap_or_default();
        Some(Instant::now() + wait)
    }

    /// Spawn [`SyncEngine::run_connectivity`] on the runtime.
    pub fn spawn_connectivity(&self, signals: mpsc::Receiver<Connectivity>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.run_connectivity(signals).await })
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
