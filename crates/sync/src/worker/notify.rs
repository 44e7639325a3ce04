// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push notifications and click routing.

use pantry_core::{NotificationData, NotificationPayload};

use super::fetch::strip_origin;

/// Title used when a push carries no usable payload.
pub const DEFAULT_TITLE: &str = "Pantry";

/// A window of the app the worker can focus or message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: String,
    pub url: String,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// An existing window already showed the target.
    Focus(String),
    Open(String),
}

/// Build the notification for a push message.
///
/// The payload is normally a JSON [`NotificationPayload`]. Plain text becomes
/// the body under the default title; nothing at all gives an empty body.
pub fn notification_from_push(data: Option<&[u8]>) -> NotificationPayload {
    let fallback = |body: String| NotificationPayload {
        title: DEFAULT_TITLE.to_string(),
        body,
        tag: None,
        data: NotificationData::default(),
    };
    match data {
        None => fallback(String::new()),
        Some(bytes) => serde_json::from_slice(bytes)
            .unwrap_or_else(|_| fallback(String::from_utf8_lossy(bytes).trim().to_string())),
    }
}

/// Focus a window already at `target`, else open a new one.
pub fn route_click(clients: &[ClientWindow], target: &str) -> ClickAction {
    let wanted = strip_origin(target);
    clients
        .iter()
        .find(|client| strip_origin(&client.url) == wanted)
        .map(|client| ClickAction::Focus(client.id.clone()))
        .unwrap_or_else(|| ClickAction::Open(target.to_string()))
}

/// Where a click on this notification should lead.
pub fn click_target(notification: &NotificationPayload) -> &str {
    notification.data.url.as_deref().unwrap_or("/")
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
