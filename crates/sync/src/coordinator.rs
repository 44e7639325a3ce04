// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One synchronize cycle: push every due change, then pull every collection.
//!
//! A cycle never fails as a whole. Each problem is recorded in the
//! [`SyncReport`] and the cycle moves on where it safely can:
//!
//! - a transient push failure schedules a retry and skips the rest of that
//!   entity's changes for this cycle
//! - a rejection or an exhausted change becomes a [`FailedChange`] and holds
//!   back later changes of the same entity until the user acts
//! - a pull failure stops the pull phase, leaving the next collections'
//!   markers untouched
//!
//! Only one cycle runs at a time. Callers in the same process share the
//! running cycle's report; other processes are kept out by a lease row in
//! the store.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use pantry_core::{
    ClockSource, ConflictResolver, FailedChange, PushRequest, RetryDecision, RetryScheduler,
    Store, SyncIssue, SyncPhase, SyncReport, UnsyncedLocalWins,
};
use tokio::sync::{broadcast, watch, Mutex};

use crate::config::SyncConfig;
use crate::notice::Notice;
use crate::transport::{Transport, TransportError, TransportFuture, TransportResult};

/// Name of the cross-process sync lease.
pub const SYNC_LEASE: &str = "sync";

type Flight = watch::Receiver<Option<SyncReport>>;

/// Runs synchronize cycles against a store and a transport.
pub struct SyncCoordinator {
    store: Arc<Mutex<Store>>,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn ConflictResolver>,
    scheduler: RetryScheduler,
    clock: Arc<dyn ClockSource>,
    collections: Vec<String>,
    request_timeout: Duration,
    lock_ttl: chrono::Duration,
    /// Identifies this coordinator in the lease table.
    holder: String,
    notices: broadcast::Sender<Notice>,
    /// Receiver for the cycle currently in flight, if any.
    flight: std::sync::Mutex<Option<Flight>>,
}

/// What happened to one change during the push phase.
enum PushOutcome {
    Acked,
    /// Acked, cancelled or discarded before it could be sent.
    Gone,
    Retrying,
    Failed(FailedChange),
    StoreError,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<Mutex<Store>>,
        transport: Arc<dyn Transport>,
        config: &SyncConfig,
        clock: Arc<dyn ClockSource>,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        SyncCoordinator {
            store,
            transport,
            resolver: Arc::new(UnsyncedLocalWins),
            scheduler: RetryScheduler::new(config.retry.clone()),
            clock,
            collections: config.collections.clone(),
            request_timeout: config.request_timeout(),
            lock_ttl: config.lock_ttl(),
            holder: format!("{}-{}", std::process::id(), uuid::Uuid::new_v4()),
            notices,
            flight: std::sync::Mutex::new(None),
        }
    }

    /// Replace the conflict policy used when applying pulls.
    pub fn with_resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Run a cycle, or join the one already running in this process.
    ///
    /// Concurrent callers all receive the same report. If the running cycle
    /// is cancelled, a waiting caller starts a fresh one.
    pub async fn synchronize(&self) -> SyncReport {
        loop {
            let (mut rx, leader) = {
                let mut slot = self.flight.lock().unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref() {
                    Some(rx) => (rx.clone(), None),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        *slot = Some(rx.clone());
                        (rx, Some(tx))
                    }
                }
            };

            if let Some(tx) = leader {
                let _clear = ClearFlight(&self.flight);
                let report = self.run_cycle().await;
                tx.send_replace(Some(report.clone()));
                return report;
            }

            tracing::debug!("joining sync cycle already in flight");
            let joined = rx.wait_for(Option::is_some).await.map(|r| (*r).clone());
            if let Ok(Some(report)) = joined {
                return report;
            }
            // The leader was dropped before finishing.
        }
    }

    async fn run_cycle(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let now = self.clock.now();
        let acquired = self
            .store
            .lock()
            .await
            .try_acquire_lease(SYNC_LEASE, &self.holder, now, self.lock_ttl);
        match acquired {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("sync skipped, another context holds the lease");
                report.record(SyncIssue::new(
                    SyncPhase::Lock,
                    "another context is already synchronizing",
                ));
                return report;
            }
            Err(e) => {
                report.record(SyncIssue::new(SyncPhase::Store, e.to_string()));
                return report;
            }
        }

        if self.push_phase(&mut report).await {
            self.pull_phase(&mut report).await;
        }

        let released = self
            .store
            .lock()
            .await
            .release_lease(SYNC_LEASE, &self.holder);
        if let Err(e) = released {
            tracing::warn!("failed to release sync lease: {e}");
        }

        if report.is_clean() {
            tracing::info!(%report, "sync cycle finished");
        } else {
            tracing::warn!(%report, "sync cycle finished with problems");
        }
        report
    }

    /// Returns false if the cycle must stop (lease lost).
    async fn push_phase(&self, report: &mut SyncReport) -> bool {
        let listed = {
            let store = self.store.lock().await;
            store
                .pending_collections()
                .and_then(|pending| Ok((pending, store.failed_changes()?)))
        };
        let (pending, failed) = match listed {
            Ok(listed) => listed,
            Err(e) => {
                report.record(SyncIssue::new(SyncPhase::Store, e.to_string()));
                return true;
            }
        };
        let mut failed_entities: HashSet<String> =
            failed.into_iter().map(|f| f.entity_id).collect();

        for collection in push_order(&self.collections, pending) {
            let changes = self.store.lock().await.list_pending(&collection);
            let changes = match changes {
                Ok(changes) => changes,
                Err(e) => {
                    report.record(
                        SyncIssue::new(SyncPhase::Store, e.to_string()).with_collection(&collection),
                    );
                    continue;
                }
            };

            let mut skipped: HashSet<String> = HashSet::new();
            for change in changes {
                if failed_entities.contains(&change.entity_id) {
                    report.held += 1;
                    continue;
                }
                if skipped.contains(&change.entity_id) {
                    report.deferred += 1;
                    continue;
                }
                if !change.is_due(self.clock.now()) {
                    report.deferred += 1;
                    skipped.insert(change.entity_id);
                    continue;
                }

                match self.push_change(change.id, report).await {
                    PushOutcome::Acked => report.pushed += 1,
                    PushOutcome::Gone => {}
                    PushOutcome::Retrying | PushOutcome::StoreError => {
                        skipped.insert(change.entity_id);
                    }
                    PushOutcome::Failed(failed) => {
                        report.failed += 1;
                        failed_entities.insert(change.entity_id);
                        let _ = self.notices.send(Notice::ChangeFailed(failed));
                    }
                }

                if !self.renew_lease(report).await {
                    return false;
                }
            }
        }
        true
    }

    async fn push_change(&self, change_id: i64, report: &mut SyncReport) -> PushOutcome {
        let prepared = {
            let store = self.store.lock().await;
            prepare_push(&store, change_id, self.clock.now())
        };
        let request = match prepared {
            Ok(Some(request)) => request,
            Ok(None) => return PushOutcome::Gone,
            Err(e) => {
                report.record(
                    SyncIssue::new(SyncPhase::Store, e.to_string()).with_change(change_id),
                );
                return PushOutcome::StoreError;
            }
        };
        let collection = request.collection().unwrap_or_default().to_string();

        let result = self.call(self.transport.push(request)).await;

        let now = self.clock.now();
        let store = self.store.lock().await;
        match result {
            Ok(ack) => match store.ack(change_id, ack.server_id.as_deref()) {
                Ok(_) => PushOutcome::Acked,
                Err(e) => {
                    report.record(
                        SyncIssue::new(SyncPhase::Store, e.to_string()).with_change(change_id),
                    );
                    PushOutcome::StoreError
                }
            },
            Err(err) => {
                let issue = SyncIssue::new(SyncPhase::Push, err.reason())
                    .with_collection(&collection)
                    .with_change(change_id);
                report.record(issue);

                let handled = match err.rejection() {
                    Some(status) => store.reject(change_id, status, &err.reason(), now).map(|f| {
                        tracing::error!(change_id, status, "change rejected by server");
                        PushOutcome::Failed(f)
                    }),
                    None => self
                        .scheduler
                        .on_failure(&store, change_id, &err.reason(), now)
                        .map(|decision| match decision {
                            RetryDecision::Retry { .. } => PushOutcome::Retrying,
                            RetryDecision::Escalated(f) => PushOutcome::Failed(f),
                        }),
                };
                handled.unwrap_or_else(|e| {
                    report.record(
                        SyncIssue::new(SyncPhase::Store, e.to_string()).with_change(change_id),
                    );
                    PushOutcome::StoreError
                })
            }
        }
    }

    /// Returns false if the pull phase stopped early.
    async fn pull_phase(&self, report: &mut SyncReport) -> bool {
        for collection in &self.collections {
            let since = self.store.lock().await.last_sync(collection);
            let since = match since {
                Ok(since) => since,
                Err(e) => {
                    report.record(
                        SyncIssue::new(SyncPhase::Store, e.to_string()).with_collection(collection),
                    );
                    return false;
                }
            };

            let result = self.call(self.transport.pull(collection, since)).await;
            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(collection = %collection, "pull failed: {err}");
                    report.record(
                        SyncIssue::new(SyncPhase::Pull, err.to_string()).with_collection(collection),
                    );
                    return false;
                }
            };

            let applied = self.store.lock().await.apply_pull(
                collection,
                &response.records,
                self.resolver.as_ref(),
                response.server_time,
            );
            match applied {
                Ok(applied) => {
                    report.pulled += applied.applied;
                    report.conflicts += applied.conflicts;
                    tracing::debug!(
                        collection = %collection,
                        records = response.records.len(),
                        applied = applied.applied,
                        conflicts = applied.conflicts,
                        "pulled"
                    );
                }
                Err(e) => {
                    report.record(
                        SyncIssue::new(SyncPhase::Store, e.to_string()).with_collection(collection),
                    );
                    return false;
                }
            }

            if !self.renew_lease(report).await {
                return false;
            }
        }
        true
    }

    async fn renew_lease(&self, report: &mut SyncReport) -> bool {
        let now = self.clock.now();
        let renewed = self
            .store
            .lock()
            .await
            .renew_lease(SYNC_LEASE, &self.holder, now, self.lock_ttl);
        match renewed {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!("sync lease expired mid-cycle, stopping");
                report.record(SyncIssue::new(SyncPhase::Lock, "sync lease lost mid-cycle"));
                false
            }
            Err(e) => {
                report.record(SyncIssue::new(SyncPhase::Store, e.to_string()));
                false
            }
        }
    }

    async fn call<T>(&self, request: TransportFuture<'_, T>) -> TransportResult<T> {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .unwrap_or(Err(TransportError::Timeout))
    }
}

/// Clears the in-flight slot when the leading cycle ends or is dropped.
struct ClearFlight<'a>(&'a std::sync::Mutex<Option<Flight>>);

impl Drop for ClearFlight<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Re-read the change, stamp it as sent and build its request.
///
/// Done under one store lock so that no local edit can be folded into the
/// change between reading it and sending it.
fn prepare_push(
    store: &Store,
    change_id: i64,
    now: chrono::DateTime<chrono::Utc>,
) -> pantry_core::Result<Option<PushRequest>> {
    let Some(change) = store.pending_change(change_id)? else {
        return Ok(None);
    };
    let server_id = store
        .get_entity(&change.entity_id)?
        .and_then(|entity| entity.server_id);
    store.mark_sent(change_id, now)?;
    Ok(Some(PushRequest::for_change(&change, server_id.as_deref(), now)))
}

/// Configured collections first, in order, then any other collection that
/// has queued changes.
fn push_order(configured: &[String], pending: Vec<String>) -> Vec<String> {
    let mut order = configured.to_vec();
    for collection in pending {
        if !order.contains(&collection) {
            order.push(collection);
        }
    }
    order
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
