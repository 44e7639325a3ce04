// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text rendering for command output.

use chrono::{DateTime, SecondsFormat, Utc};
use pantry_core::{Entity, FailedChange, PendingChange, SyncReport};
use pantry_sync::EngineStatus;

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `<id>  <state>  <fields>`, with `*` marking unsynced entities.
pub fn format_entity(entity: &Entity) -> String {
    let marker = if entity.synced { " " } else { "*" };
    let fields = serde_json::Value::Object(entity.fields.clone());
    format!("{} {marker} {fields}", entity.id)
}

pub fn format_pending(change: &PendingChange) -> String {
    let mut line = format!(
        "#{} {} {} {}",
        change.id, change.kind, change.collection, change.entity_id
    );
    if change.attempt_count > 0 {
        line.push_str(&format!(" (attempts: {}", change.attempt_count));
        if let Some(at) = change.next_attempt_at {
            line.push_str(&format!(", next: {}", ts(at)));
        }
        line.push(')');
    }
    if let Some(error) = &change.last_error {
        line.push_str(&format!("\n    last error: {error}"));
    }
    line
}

pub fn format_failed(change: &FailedChange) -> String {
    format!(
        "#{} {} {} {}: {} after {} attempt(s)\n    {}",
        change.id,
        change.kind,
        change.collection,
        change.entity_id,
        change.cause,
        change.attempt_count,
        change.reason
    )
}

pub fn format_report(report: &SyncReport) -> String {
    let mut out = report.to_string();
    for issue in &report.errors {
        out.push_str(&format!("\n  {issue}"));
    }
    out
}

pub fn format_status(status: &EngineStatus) -> String {
    let mut out = format!(
        "pending: {}\nfailed: {}\nunsynced: {}",
        status.pending, status.failed, status.unsynced
    );
    if status.last_sync.is_empty() {
        out.push_str("\nlast sync: never");
    } else {
        out.push_str("\nlast sync:");
        for meta in &status.last_sync {
            out.push_str(&format!(
                "\n  {}: {}",
                meta.collection,
                ts(meta.last_sync_timestamp)
            ));
        }
    }
    out
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
