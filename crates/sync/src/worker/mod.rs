// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The background worker: app-shell caching, background sync and push
//! notifications, running apart from the foreground app.
//!
//! ```text
//! Installing ──install──► Activating ──activate──► Idle ◄──► Fetching
//!     │ precache failed
//!     ▼
//! Redundant
//! ```
//!
//! The worker owns no sync logic of its own; background-sync events call
//! the same [`SyncEngine`] the app uses, and the result is broadcast to every
//! open window.

pub mod fetch;
pub mod notify;

use futures_util::future::try_join_all;
use std::fmt;
use std::sync::Arc;

use pantry_core::{NotificationPayload, SyncReport, WorkerMessage};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::transport::{TransportError, TransportResult};

use fetch::{Fetcher, Request, Response, Strategy};
use notify::{ClickAction, ClientWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Activating,
    Idle,
    Fetching,
    /// Replaced or failed to install; handles nothing.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Installing => "installing",
            WorkerState::Activating => "activating",
            WorkerState::Idle => "idle",
            WorkerState::Fetching => "fetching",
            WorkerState::Redundant => "redundant",
        };
        write!(f, "{name}")
    }
}

/// Host services the worker calls out to.
///
/// Every method defaults to doing nothing, for hosts without windows.
pub trait Platform: Send + Sync {
    /// Take control of already open windows.
    fn claim_clients(&self) {}

    fn clients(&self) -> Vec<ClientWindow> {
        Vec::new()
    }

    fn post_message(&self, _message: &WorkerMessage) {}

    fn show_notification(&self, _notification: &NotificationPayload) {}

    fn focus_client(&self, _client_id: &str) {}

    fn open_window(&self, _url: &str) {}

    /// Ask the host to fire a sync event for `tag` once it is online.
    fn request_background_sync(&self, _tag: &str) {}
}

/// A host with no windows. Notifications go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Platform for Headless {
    fn show_notification(&self, notification: &NotificationPayload) {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
    }
}

pub struct BackgroundWorker {
    engine: SyncEngine,
    fetcher: Arc<dyn Fetcher>,
    platform: Arc<dyn Platform>,
    config: WorkerConfig,
    state: WorkerState,
    messages: broadcast::Sender<WorkerMessage>,
}

impl BackgroundWorker {
    pub fn new(engine: SyncEngine, fetcher: Arc<dyn Fetcher>, platform: Arc<dyn Platform>) -> Self {
        let config = engine.config().worker.clone();
        let (messages, _) = broadcast::channel(16);
        BackgroundWorker {
            engine,
            fetcher,
            platform,
            config,
            state: WorkerState::Installing,
            messages,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Messages posted to windows.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.messages.subscribe()
    }

    fn expect_state(&self, expected: WorkerState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    async fn fetch(&self, request: &Request) -> TransportResult<Response> {
        tokio::time::timeout(
            self.engine.config().request_timeout(),
            self.fetcher.fetch(request),
        )
        .await
        .unwrap_or(Err(TransportError::Timeout))
    }

    /// Precache the app shell. Any failure makes the worker redundant.
    pub async fn install(&mut self) -> Result<()> {
        self.expect_state(WorkerState::Installing, "install")?;
        match self.precache().await {
            Ok(count) => {
                tracing::info!(cache = %self.config.cache_name(), assets = count, "installed");
                self.state = WorkerState::Activating;
                Ok(())
            }
            Err(e) => {
                tracing::error!("install failed, worker is redundant: {e}");
                self.state = WorkerState::Redundant;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        let fetches = self.config.shell_assets.iter().map(|asset| async move {
            let request = Request::get(asset.as_str());
            let response = self.fetch(&request).await.map_err(|e| Error::InstallFailed {
                asset: asset.clone(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(Error::InstallFailed {
                    asset: asset.clone(),
                    reason: format!("status {}", response.status),
                });
            }
            Ok::<_, Error>((request, response))
        });
        let fetched = try_join_all(fetches).await?;

        let now = self.engine.now();
        let cache_name = self.config.cache_name();
        let store = self.engine.store();
        let store = store.lock().await;
        for (request, response) in &fetched {
            store.cache_put(&cache_name, request.target(), &response.to_cached(now))?;
        }
        Ok(fetched.len())
    }

    /// Delete caches left by older versions and take over open windows.
    ///
    /// Returns the names of the deleted caches.
    pub async fn activate(&mut self) -> Result<Vec<String>> {
        self.expect_state(WorkerState::Activating, "activate")?;
        let current = self.config.cache_name();
        let prefix = format!("{}-", self.config.cache_prefix);

        let mut deleted = Vec::new();
        {
            let store = self.engine.store();
            let store = store.lock().await;
            for name in store.cache_names()? {
                if name.starts_with(&prefix) && name != current {
                    store.cache_delete(&name)?;
                    deleted.push(name);
                }
            }
        }

        self.platform.claim_clients();
        self.state = WorkerState::Idle;
        tracing::info!(cache = %current, removed = ?deleted, "activated");
        Ok(deleted)
    }

    /// Answer a request from a window.
    ///
    /// Network and cache problems never surface as errors; they turn into
    /// fallback responses.
    pub async fn handle_fetch(&mut self, request: Request) -> Result<Response> {
        self.expect_state(WorkerState::Idle, "handle fetch")?;
        self.state = WorkerState::Fetching;
        let response = self.respond(&request).await;
        self.state = WorkerState::Idle;
        Ok(response)
    }

    async fn respond(&self, request: &Request) -> Response {
        let strategy = fetch::strategy(request, &self.config);
        let fetched = self.fetch(request).await;

        let err = match fetched {
            Ok(response) => {
                if strategy == Strategy::NetworkFirst && response.is_success() {
                    self.cache_response(request, &response).await;
                }
                return response;
            }
            Err(err) => err,
        };
        tracing::debug!(url = %request.url, "network unavailable: {err}");

        if strategy == Strategy::NetworkOnly {
            return Response::unavailable();
        }

        let cache_name = self.config.cache_name();
        let store = self.engine.store();
        let store = store.lock().await;
        let lookup = |target: &str| match store.cache_match(&cache_name, target) {
            Ok(found) => found.map(Response::from_cached),
            Err(e) => {
                tracing::warn!(url = target, "cache lookup failed: {e}");
                None
            }
        };

        if let Some(cached) = lookup(request.target()) {
            return cached;
        }
        if !request.is_navigation() {
            return Response::unavailable();
        }
        self.config
            .offline_url
            .as_deref()
            .and_then(lookup)
            .unwrap_or_else(Response::builtin_offline_page)
    }

    async fn cache_response(&self, request: &Request, response: &Response) {
        let cached = response.to_cached(self.engine.now());
        let store = self.engine.store();
        let stored = store
            .lock()
            .await
            .cache_put(&self.config.cache_name(), request.target(), &cached);
        if let Err(e) = stored {
            tracing::warn!(url = %request.url, "failed to cache response: {e}");
        }
    }

    /// Record a background-sync registration and ask the host for an event.
    pub async fn register_background_sync(&self, tag: &str) -> Result<()> {
        if self.state == WorkerState::Redundant {
            return Err(Error::InvalidTransition {
                state: self.state,
                action: "register background sync",
            });
        }
        let now = self.engine.now();
        self.engine.store().lock().await.register_sync_tag(tag, now)?;
        self.platform.request_background_sync(tag);
        Ok(())
    }

    /// Handle a background-sync event from the host.
    ///
    /// Unknown tags are ignored. A registration is kept until a cycle for it
    /// comes back clean, so the host fires it again later.
    pub async fn on_sync(&mut self, tag: &str) -> Result<Option<SyncReport>> {
        self.expect_state(WorkerState::Idle, "handle sync")?;
        let registered = self.engine.store().lock().await.sync_tags()?;
        let registered = registered.iter().any(|t| t == tag);
        if !registered && tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Ok(None);
        }

        let report = self.sync_and_broadcast().await;
        if registered && report.is_clean() {
            self.engine.store().lock().await.unregister_sync_tag(tag)?;
        }
        Ok(Some(report))
    }

    async fn sync_and_broadcast(&self) -> SyncReport {
        let report = self.engine.synchronize().await;
        let message = WorkerMessage::sync_complete(report.clone());
        self.platform.post_message(&message);
        let _ = self.messages.send(message);
        report
    }

    /// Show the notification carried by a push message.
    pub fn on_push(&self, data: Option<&[u8]>) -> NotificationPayload {
        let notification = notify::notification_from_push(data);
        self.platform.show_notification(&notification);
        notification
    }

    /// Focus a window already showing the notification's target, or open one.
    pub fn on_notification_click(&self, notification: &NotificationPayload) -> ClickAction {
        let action = notify::route_click(&self.platform.clients(), notify::click_target(notification));
        match &action {
            ClickAction::Focus(id) => self.platform.focus_client(id),
            ClickAction::Open(url) => self.platform.open_window(url),
        }
        action
    }

    /// Run the worker as its own task.
    ///
    /// The task installs and activates first if needed, then serves commands
    /// one at a time until every handle is dropped.
    pub fn spawn(mut self) -> (WorkerHandle, JoinHandle<()>) {
        let (commands, mut rx) = mpsc::channel(32);
        let handle = WorkerHandle {
            commands,
            messages: self.messages.clone(),
        };

        let task = tokio::spawn(async move {
            if self.state == WorkerState::Installing && self.install().await.is_ok() {
                if let Err(e) = self.activate().await {
                    tracing::error!("activation failed: {e}");
                }
            }
            while let Some(command) = rx.recv().await {
                self.dispatch(command).await;
            }
            tracing::debug!("worker stopped");
        });
        (handle, task)
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::Sync { reply } => {
                let result = match self.expect_state(WorkerState::Idle, "handle sync") {
                    Ok(()) => Ok(self.sync_and_broadcast().await),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Fetch { request, reply } => {
                let _ = reply.send(self.handle_fetch(request).await);
            }
            Command::RegisterSync { tag, reply } => {
                let _ = reply.send(self.register_background_sync(&tag).await);
            }
            Command::SyncEvent { tag, reply } => {
                let _ = reply.send(self.on_sync(&tag).await);
            }
            Command::Push { data, reply } => {
                let _ = reply.send(self.on_push(data.as_deref()));
            }
            Command::NotificationClick { notification, reply } => {
                let _ = reply.send(self.on_notification_click(&notification));
            }
        }
    }
}

enum Command {
    Sync {
        reply: oneshot::Sender<Result<SyncReport>>,
    },
    Fetch {
        request: Request,
        reply: oneshot::Sender<Result<Response>>,
    },
    RegisterSync {
        tag: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SyncEvent {
        tag: String,
        reply: oneshot::Sender<Result<Option<SyncReport>>>,
    },
    Push {
        data: Option<Vec<u8>>,
        reply: oneshot::Sender<NotificationPayload>,
    },
    NotificationClick {
        notification: NotificationPayload,
        reply: oneshot::Sender<ClickAction>,
    },
}

/// Talks to a spawned [`BackgroundWorker`].
#[derive(Clone)]
pub struct WorkerHandle {
    commands: mpsc::Sender<Command>,
    messages: broadcast::Sender<WorkerMessage>,
}

impl WorkerHandle {
    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| Error::WorkerGone)?;
        rx.await.map_err(|_| Error::WorkerGone)
    }

    /// Ask the worker to sync now and wait for its report.
    pub async fn request_sync(&self) -> Result<SyncReport> {
        self.call(|reply| Command::Sync { reply }).await?
    }

    pub async fn fetch(&self, request: Request) -> Result<Response> {
        self.call(|reply| Command::Fetch { request, reply }).await?
    }

    pub async fn register_background_sync(&self, tag: &str) -> Result<()> {
        let tag = tag.to_string();
        self.call(|reply| Command::RegisterSync { tag, reply }).await?
    }

    /// Deliver a background-sync event, as the host would once online.
    pub async fn sync_event(&self, tag: &str) -> Result<Option<SyncReport>> {
        let tag = tag.to_string();
        self.call(|reply| Command::SyncEvent { tag, reply }).await?
    }

    pub async fn push(&self, data: Option<Vec<u8>>) -> Result<NotificationPayload> {
        self.call(|reply| Command::Push { data, reply }).await
    }

    pub async fn notification_click(
        &self,
        notification: NotificationPayload,
    ) -> Result<ClickAction> {
        self.call(|reply| Command::NotificationClick {
            notification,
            reply,
        })
        .await
    }

    /// Messages the worker posts to windows.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.messages.subscribe()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
