// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-engine scenarios: clients sharing one in-memory server.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use crate::test_helpers::{engine, fields, MemoryServer};
use crate::transport::TransportError;

#[tokio::test]
async fn two_clients_converge() {
    let server = MemoryServer::new();
    let (alice, _) = engine(&server);
    let (bob, _) = engine(&server);

    let lait = alice
        .add("shopping", fields(json!({ "name": "Lait", "qty": 2 })))
        .await
        .unwrap();
    let report = alice.synchronize().await;
    assert_eq!(report.pushed, 1);

    bob.synchronize().await;
    let seen = bob.entities("shopping").await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, lait.id, "the creator's id travels with the record");
    assert_eq!(seen[0].fields, fields(json!({ "name": "Lait", "qty": 2 })));
    assert!(seen[0].synced);

    bob.update(&seen[0].id, fields(json!({ "qty": 3 })))
        .await
        .unwrap();
    bob.synchronize().await;
    alice.synchronize().await;

    let mine = alice.entity(&lait.id).await.unwrap();
    assert_eq!(mine.fields["qty"], json!(3));
    assert!(mine.synced);
}

#[tokio::test]
async fn offline_edits_collapse_into_one_push() {
    let server = MemoryServer::new();
    let (client, _) = engine(&server);

    let item = client
        .add("shopping", fields(json!({ "name": "Oeufs", "qty": 6 })))
        .await
        .unwrap();
    client
        .update(&item.id, fields(json!({ "qty": 12 })))
        .await
        .unwrap();
    client
        .update(&item.id, fields(json!({ "note": "bio" })))
        .await
        .unwrap();

    client.synchronize().await;
    let pushes = server.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].data["qty"], json!(12));
    assert_eq!(pushes[0].data["note"], json!("bio"));
}

#[tokio::test]
async fn sent_changes_stay_in_order() {
    let server = MemoryServer::new();
    let (client, _) = engine(&server);
    let item = client
        .add("inventory", fields(json!({ "name": "Riz", "qty": 1 })))
        .await
        .unwrap();
    client.synchronize().await;

    client
        .update(&item.id, fields(json!({ "qty": 2 })))
        .await
        .unwrap();
    client
        .update(&item.id, fields(json!({ "qty": 3 })))
        .await
        .unwrap();
    let report = client.synchronize().await;

    assert_eq!(report.pushed, 2);
    let qtys: Vec<_> = server.pushes()[1..]
        .iter()
        .map(|p| p.data["qty"].clone())
        .collect();
    assert_eq!(qtys, vec![json!(2), json!(3)]);
    let server_id = client.entity(&item.id).await.unwrap().server_id.unwrap();
    assert_eq!(server.record(&server_id).unwrap().fields["qty"], json!(3));
}

#[tokio::test]
async fn unsynced_local_edit_survives_a_pull() {
    let server = MemoryServer::new();
    let (client, clock) = engine(&server);
    let item = client
        .add("shopping", fields(json!({ "name": "Lait", "qty": 1 })))
        .await
        .unwrap();
    client.synchronize().await;
    let server_id = client.entity(&item.id).await.unwrap().server_id.unwrap();

    server.edit(&server_id, fields(json!({ "qty": 5 })));
    client
        .update(&item.id, fields(json!({ "qty": 4 })))
        .await
        .unwrap();
    server.fail_next_push(TransportError::Connection("reset".into()));

    let report = client.synchronize().await;
    assert_eq!(report.conflicts, 1);
    let local = client.entity(&item.id).await.unwrap();
    assert_eq!(local.fields["qty"], json!(4));
    assert!(!local.synced);

    clock.advance(chrono::Duration::seconds(2));
    let report = client.synchronize().await;
    assert_eq!(report.pushed, 1);
    assert_eq!(server.record(&server_id).unwrap().fields["qty"], json!(4));
    assert!(client.entity(&item.id).await.unwrap().synced);
}

#[tokio::test]
async fn settled_entities_take_server_state() {
    let server = MemoryServer::new();
    let (client, _) = engine(&server);
    let item = client
        .add("shopping", fields(json!({ "name": "Pain" })))
        .await
        .unwrap();
    client.synchronize().await;
    let server_id = client.entity(&item.id).await.unwrap().server_id.unwrap();

    server.edit(&server_id, fields(json!({ "name": "Pain complet" })));
    let report = client.synchronize().await;

    assert_eq!(report.conflicts, 0);
    let local = client.entity(&item.id).await.unwrap();
    assert_eq!(local.field_str("name"), Some("Pain complet"));
}

#[tokio::test]
async fn deletes_reach_the_server_and_other_clients() {
    let server = MemoryServer::new();
    let (alice, _) = engine(&server);
    let (bob, _) = engine(&server);
    let item = alice
        .add("shopping", fields(json!({ "name": "Beurre" })))
        .await
        .unwrap();
    alice.synchronize().await;
    bob.synchronize().await;
    assert_eq!(bob.entities("shopping").await.unwrap().len(), 1);

    alice.delete(&item.id).await.unwrap();
    assert!(alice.entities("shopping").await.unwrap().is_empty());
    alice.synchronize().await;
    assert!(server.records()[0].deleted);
    assert!(alice.entity(&item.id).await.is_err());

    bob.synchronize().await;
    assert!(bob.entities("shopping").await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_cycle_loses_nothing() {
    let server = MemoryServer::new();
    let (client, clock) = engine(&server);
    server.set_offline(true);
    client
        .add("shopping", fields(json!({ "name": "Lait" })))
        .await
        .unwrap();

    let report = client.synchronize().await;
    assert_eq!(report.pushed, 0);
    assert!(!report.is_clean());
    assert_eq!(client.pending().await.unwrap().len(), 1);

    server.set_offline(false);
    clock.advance(chrono::Duration::seconds(2));
    let report = client.synchronize().await;
    assert_eq!(report.pushed, 1);
    assert!(report.is_clean());
}
