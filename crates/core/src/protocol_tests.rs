// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use serde_json::json;

fn change(kind: ChangeKind, payload: Value) -> PendingChange {
    PendingChange {
        id: 1,
        kind,
        collection: "shopping".into(),
        entity_id: "local-1".into(),
        payload: payload.as_object().unwrap().clone(),
        enqueued_at: Utc::now(),
        attempt_count: 0,
        next_attempt_at: None,
        last_error: None,
    }
}

#[test]
fn push_request_wire_shape() {
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let req = PushRequest::for_change(
        &change(ChangeKind::Add, json!({"name": "Lait", "qty": 2})),
        None,
        ts,
    );

    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["action"], "add");
    assert_eq!(value["data"]["id"], "local-1");
    assert_eq!(value["data"]["collection"], "shopping");
    assert_eq!(value["data"]["name"], "Lait");
    assert!(value["data"].get("serverId").is_none());
    assert_eq!(value["clientTimestamp"], "2026-03-01T09:30:00Z");
}

#[test]
fn push_request_carries_server_id_when_known() {
    let req = PushRequest::for_change(
        &change(ChangeKind::Update, json!({"qty": 3})),
        Some("srv-9"),
        Utc::now(),
    );
    assert_eq!(req.server_id(), Some("srv-9"));
    assert_eq!(req.local_id(), Some("local-1"));
    assert_eq!(req.collection(), Some("shopping"));
}

#[test]
fn push_ack_tolerates_missing_server_id() {
    let ack: PushAck = serde_json::from_str("{}").unwrap();
    assert!(ack.server_id.is_none());

    let ack: PushAck = serde_json::from_str(r#"{"serverId":"srv-1"}"#).unwrap();
    assert_eq!(ack.server_id.as_deref(), Some("srv-1"));
}

#[test]
fn server_record_flattens_fields() {
    let record: ServerRecord = serde_json::from_value(json!({
        "id": "srv-1",
        "localId": "local-1",
        "updatedAt": "2026-03-01T10:00:00Z",
        "name": "Lait",
        "qty": 2
    }))
    .unwrap();

    assert_eq!(record.id, "srv-1");
    assert_eq!(record.local_id.as_deref(), Some("local-1"));
    assert!(!record.deleted);
    let fields = record.domain_fields();
    assert_eq!(fields.get("name"), Some(&json!("Lait")));
    assert_eq!(fields.len(), 2);
}

#[test]
fn pull_response_parses() {
    let response: PullResponse = serde_json::from_value(json!({
        "records": [
            {"id": "srv-2", "updatedAt": "2026-03-01T10:00:00Z", "deleted": true}
        ],
        "serverTime": "2026-03-01T10:00:05Z"
    }))
    .unwrap();
    assert_eq!(response.records.len(), 1);
    assert!(response.records[0].deleted);
    assert_eq!(response.server_time, Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 5).unwrap());
}

#[test]
fn notification_payload_parses() {
    let payload: NotificationPayload = serde_json::from_value(json!({
        "title": "Stock bas",
        "body": "Plus que 1 litre de lait",
        "tag": "low-stock",
        "data": {"url": "/inventory/milk"}
    }))
    .unwrap();
    assert_eq!(payload.tag.as_deref(), Some("low-stock"));
    assert_eq!(payload.data.url.as_deref(), Some("/inventory/milk"));
}

#[test]
fn sync_complete_message_shape() {
    let msg = WorkerMessage::sync_complete(SyncReport { pushed: 1, ..SyncReport::default() });
    let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
    assert_eq!(value["type"], "SYNC_COMPLETE");
    assert_eq!(value["result"]["pushed"], 1);
}
