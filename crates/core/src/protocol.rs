// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire messages for the sync endpoints and between execution contexts.
//!
//! The protocol is small:
//! - `POST /sync` carries one [`PushRequest`] and answers with a [`PushAck`]
//! - `GET /sync?since=…&collection=…` answers with a [`PullResponse`]
//! - the background worker tells foreground clients about finished cycles
//!   with [`WorkerMessage::SyncComplete`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::change::{ChangeKind, PendingChange};
use crate::entity::{strip_reserved, Fields};
use crate::report::SyncReport;

/// Body of `POST /sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub action: ChangeKind,
    /// Entity payload including the local id (idempotency key).
    pub data: Fields,
    pub client_timestamp: DateTime<Utc>,
}

impl PushRequest {
    /// Builds the request for a queued change.
    ///
    /// `server_id` is included once the entity has one, so updates and
    /// deletes can be routed without the idempotency key lookup.
    pub fn for_change(
        change: &PendingChange,
        server_id: Option<&str>,
        client_timestamp: DateTime<Utc>,
    ) -> Self {
        let mut data = change.payload.clone();
        data.insert("id".to_string(), Value::String(change.entity_id.clone()));
        data.insert("collection".to_string(), Value::String(change.collection.clone()));
        if let Some(server_id) = server_id {
            data.insert("serverId".to_string(), Value::String(server_id.to_string()));
        }
        PushRequest { action: change.kind, data, client_timestamp }
    }

    /// Local id carried in `data.id`.
    pub fn local_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn collection(&self) -> Option<&str> {
        self.data.get("collection").and_then(Value::as_str)
    }

    pub fn server_id(&self) -> Option<&str> {
        self.data.get("serverId").and_then(Value::as_str)
    }
}

/// Successful response to `POST /sync`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAck {
    #[serde(default)]
    pub server_id: Option<String>,
}

/// One entity as returned by the pull endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// Server-assigned id.
    pub id: String,
    /// Idempotency key echoed back from the creating client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// Set when the entity was deleted on the server.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    #[serde(flatten)]
    pub fields: Fields,
}

impl ServerRecord {
    /// Domain fields with engine-owned keys removed.
    pub fn domain_fields(&self) -> Fields {
        strip_reserved(self.fields.clone())
    }
}

/// Response to `GET /sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub records: Vec<ServerRecord>,
    /// Authoritative server time; becomes the next `since`.
    pub server_time: DateTime<Utc>,
}

/// Target of a notification click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default)]
    pub url: Option<String>,
}

/// Payload of a server push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Notifications sharing a tag replace each other.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub data: NotificationData,
}

/// Messages posted from the background worker to foreground clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// A synchronize cycle finished.
    SyncComplete { result: SyncReport },
}

impl WorkerMessage {
    pub fn sync_complete(result: SyncReport) -> Self {
        WorkerMessage::SyncComplete { result }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
