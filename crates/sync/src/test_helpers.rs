// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sync server and engine builders for tests.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pantry_core::entity::strip_reserved;
use pantry_core::{
    ChangeKind, Fields, ManualClock, NotificationPayload, PullResponse, PushAck, PushRequest,
    ServerRecord, Store, WorkerMessage,
};
use serde_json::Value;

use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::transport::{Transport, TransportError, TransportFuture};
use crate::worker::fetch::{Fetcher, Request, Response, ResponseSource};
use crate::worker::notify::ClientWindow;
use crate::worker::Platform;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Config with jitter disabled so retry deadlines are exact.
pub fn test_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.retry.jitter = 0.0;
    config
}

/// An engine on an in-memory store, a manual clock and the given server.
pub fn engine(server: &Arc<MemoryServer>) -> (SyncEngine, Arc<ManualClock>) {
    engine_with(server, test_config())
}

pub fn engine_with(server: &Arc<MemoryServer>, config: SyncConfig) -> (SyncEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let engine = SyncEngine::with_clock(
        Store::open_in_memory().unwrap(),
        server.clone(),
        config,
        clock.clone(),
    );
    (engine, clock)
}

#[derive(Default)]
struct ServerInner {
    /// Records by server id, in creation order.
    records: Vec<ServerRecord>,
    by_local_id: HashMap<String, String>,
    next_id: u64,
    /// Logical time, one second per write.
    ticks: i64,
    pushes: Vec<PushRequest>,
    pulls: Vec<(String, Option<DateTime<Utc>>)>,
    push_failures: VecDeque<TransportError>,
    pull_failures: VecDeque<TransportError>,
    references: HashMap<String, Value>,
    reference_fetches: usize,
    offline: bool,
    push_delay: Option<Duration>,
}

impl ServerInner {
    fn now(&self) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(self.ticks)
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        self.now()
    }

    fn find(&mut self, request: &PushRequest) -> Option<&mut ServerRecord> {
        let server_id = request
            .server_id()
            .map(str::to_string)
            .or_else(|| request.local_id().and_then(|l| self.by_local_id.get(l).cloned()))?;
        self.records.iter_mut().find(|r| r.id == server_id)
    }

    fn apply(&mut self, request: PushRequest) -> Result<PushAck, TransportError> {
        let data = strip_reserved(request.data.clone());
        match request.action {
            ChangeKind::Add => {
                let local_id = request.local_id().map(str::to_string);
                if let Some(existing) = local_id.as_ref().and_then(|l| self.by_local_id.get(l)) {
                    return Ok(PushAck {
                        server_id: Some(existing.clone()),
                    });
                }
                self.next_id += 1;
                let id = format!("srv-{}", self.next_id);
                let updated_at = self.tick();
                if let Some(local_id) = &local_id {
                    self.by_local_id.insert(local_id.clone(), id.clone());
                }
                self.records.push(ServerRecord {
                    id: id.clone(),
                    local_id,
                    collection: request.collection().map(str::to_string),
                    updated_at,
                    deleted: false,
                    fields: data,
                });
                Ok(PushAck { server_id: Some(id) })
            }
            ChangeKind::Update | ChangeKind::Delete => {
                let updated_at = self.now() + chrono::Duration::seconds(1);
                let Some(record) = self.find(&request) else {
                    return Err(TransportError::Status {
                        status: 404,
                        body: "no such entity".into(),
                    });
                };
                if request.action == ChangeKind::Delete {
                    record.deleted = true;
                } else {
                    for (key, value) in data {
                        record.fields.insert(key, value);
                    }
                }
                record.updated_at = updated_at;
                let id = record.id.clone();
                self.tick();
                Ok(PushAck { server_id: Some(id) })
            }
        }
    }
}

/// A sync server that lives in memory.
///
/// Dedupes adds by local id like a real server, assigns `srv-N` ids, and can
/// be told to fail or stall.
#[derive(Default)]
pub struct MemoryServer {
    inner: Mutex<ServerInner>,
}

impl MemoryServer {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryServer::default())
    }

    /// Write a record as if another client had pushed it.
    pub fn seed(&self, collection: &str, data: Fields) -> String {
        let mut inner = self.inner.lock().unwrap();
        let mut request_data = data;
        request_data.insert("collection".into(), Value::String(collection.into()));
        let request = PushRequest {
            action: ChangeKind::Add,
            data: request_data,
            client_timestamp: t0(),
        };
        inner.apply(request).unwrap().server_id.unwrap()
    }

    /// Edit a record as if another client had pushed an update.
    pub fn edit(&self, server_id: &str, patch: Fields) {
        let mut inner = self.inner.lock().unwrap();
        let mut data = patch;
        data.insert("serverId".into(), Value::String(server_id.into()));
        let request = PushRequest {
            action: ChangeKind::Update,
            data,
            client_timestamp: t0(),
        };
        inner.apply(request).unwrap();
    }

    pub fn record(&self, server_id: &str) -> Option<ServerRecord> {
        let inner = self.inner.lock().unwrap();
        inner.records.iter().find(|r| r.id == server_id).cloned()
    }

    pub fn records(&self) -> Vec<ServerRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn pushes(&self) -> Vec<PushRequest> {
        self.inner.lock().unwrap().pushes.clone()
    }

    pub fn pulls(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.inner.lock().unwrap().pulls.clone()
    }

    pub fn reference_fetches(&self) -> usize {
        self.inner.lock().unwrap().reference_fetches
    }

    pub fn fail_next_push(&self, err: TransportError) {
        self.inner.lock().unwrap().push_failures.push_back(err);
    }

    pub fn fail_next_pull(&self, err: TransportError) {
        self.inner.lock().unwrap().pull_failures.push_back(err);
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    pub fn set_push_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().push_delay = Some(delay);
    }

    pub fn set_reference(&self, key: &str, value: Value) {
        self.inner
            .lock()
            .unwrap()
            .references
            .insert(key.into(), value);
    }
}

fn offline_error() -> TransportError {
    TransportError::Connection("server unreachable".into())
}

impl Transport for MemoryServer {
    fn push(&self, request: PushRequest) -> TransportFuture<'_, PushAck> {
        Box::pin(async move {
            let delay = self.inner.lock().unwrap().push_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut inner = self.inner.lock().unwrap();
            inner.pushes.push(request.clone());
            if inner.offline {
                return Err(offline_error());
            }
            if let Some(err) = inner.push_failures.pop_front() {
                return Err(err);
            }
            inner.apply(request)
        })
    }

    fn pull(
        &self,
        collection: &str,
        since: Option<DateTime<Utc>>,
    ) -> TransportFuture<'_, PullResponse> {
        let collection = collection.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.pulls.push((collection.clone(), since));
            if inner.offline {
                return Err(offline_error());
            }
            if let Some(err) = inner.pull_failures.pop_front() {
                return Err(err);
            }
            let records = inner
                .records
                .iter()
                .filter(|r| r.collection.as_deref() == Some(collection.as_str()))
                .filter(|r| since.map_or(true, |since| r.updated_at > since))
                .cloned()
                .collect();
            Ok(PullResponse {
                records,
                server_time: inner.now(),
            })
        })
    }

    fn fetch_reference(&self, key: &str) -> TransportFuture<'_, Value> {
        let key = key.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.reference_fetches += 1;
            if inner.offline {
                return Err(offline_error());
            }
            inner
                .references
                .get(&key)
                .cloned()
                .ok_or(TransportError::Status {
                    status: 404,
                    body: String::new(),
                })
        })
    }
}

/// A fetcher serving canned responses by path.
#[derive(Default)]
pub struct MemoryFetcher {
    inner: Mutex<FetcherInner>,
}

#[derive(Default)]
struct FetcherInner {
    responses: HashMap<String, (u16, String)>,
    offline: bool,
    requests: Vec<String>,
}

impl MemoryFetcher {
    /// Serves every default shell asset with a small body.
    pub fn with_shell() -> Arc<Self> {
        let fetcher = MemoryFetcher::default();
        for asset in crate::config::WorkerConfig::default().shell_assets {
            let body = format!("shell:{asset}");
            fetcher.serve(&asset, 200, &body);
        }
        Arc::new(fetcher)
    }

    pub fn serve(&self, target: &str, status: u16, body: &str) {
        self.inner
            .lock()
            .unwrap()
            .responses
            .insert(target.into(), (status, body.into()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, request: &Request) -> TransportFuture<'_, Response> {
        let target = request.target().to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(target.clone());
            if inner.offline {
                return Err(offline_error());
            }
            let (status, body) = inner
                .responses
                .get(&target)
                .cloned()
                .unwrap_or((404, "not found".into()));
            Ok(Response {
                status,
                headers: vec![("content-type".into(), "text/plain".into())],
                body: body.into_bytes(),
                source: ResponseSource::Network,
            })
        })
    }
}

/// Everything the worker asked the host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    Claimed,
    Message(WorkerMessage),
    Notification(NotificationPayload),
    Focus(String),
    Open(String),
    BackgroundSync(String),
}

#[derive(Default)]
pub struct RecordingPlatform {
    pub windows: Mutex<Vec<ClientWindow>>,
    events: Mutex<Vec<PlatformEvent>>,
}

impl RecordingPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingPlatform::default())
    }

    pub fn open(&self, id: &str, url: &str) {
        self.windows.lock().unwrap().push(ClientWindow {
            id: id.into(),
            url: url.into(),
        });
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: PlatformEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Platform for RecordingPlatform {
    fn claim_clients(&self) {
        self.record(PlatformEvent::Claimed);
    }

    fn clients(&self) -> Vec<ClientWindow> {
        self.windows.lock().unwrap().clone()
    }

    fn post_message(&self, message: &WorkerMessage) {
        self.record(PlatformEvent::Message(message.clone()));
    }

    fn show_notification(&self, notification: &NotificationPayload) {
        self.record(PlatformEvent::Notification(notification.clone()));
    }

    fn focus_client(&self, client_id: &str) {
        self.record(PlatformEvent::Focus(client_id.into()));
    }

    fn open_window(&self, url: &str) {
        self.record(PlatformEvent::Open(url.into()));
    }

    fn request_background_sync(&self, tag: &str) {
        self.record(PlatformEvent::BackgroundSync(tag.into()));
    }
}
