// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn status(status: u16) -> TransportError {
    TransportError::Status {
        status,
        body: String::new(),
    }
}

#[parameterized(
    bad_request = { 400, Some(400) },
    unauthorized = { 401, Some(401) },
    not_found = { 404, Some(404) },
    conflict = { 409, Some(409) },
    unprocessable = { 422, Some(422) },
    request_timeout = { 408, None },
    too_many_requests = { 429, None },
    server_error = { 500, None },
    unavailable = { 503, None },
)]
fn classifies_status_codes(code: u16, rejection: Option<u16>) {
    let err = status(code);
    assert_eq!(err.rejection(), rejection);
    assert_eq!(err.is_transient(), rejection.is_none());
}

#[test]
fn network_failures_are_transient() {
    assert!(TransportError::Timeout.is_transient());
    assert!(TransportError::Connection("refused".into()).is_transient());
    assert!(TransportError::InvalidResponse("eof".into()).is_transient());
}

#[test]
fn reason_prefers_server_body() {
    let err = TransportError::Status {
        status: 422,
        body: " qty must be positive \n".into(),
    };
    assert_eq!(err.reason(), "422: qty must be positive");
    assert_eq!(status(503).reason(), "server returned 503: ");
    assert_eq!(TransportError::Timeout.reason(), "request timed out");
}

#[test]
fn http_transport_normalizes_base_url() {
    let endpoint = EndpointConfig {
        base_url: "https://pantry.example/api/".into(),
        ..EndpointConfig::default()
    };
    let transport = HttpTransport::new(&endpoint).unwrap();
    assert_eq!(transport.base_url(), "https://pantry.example/api");
    assert_eq!(transport.url("/sync"), "https://pantry.example/api/sync");
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let endpoint = EndpointConfig {
        // Port 9 (discard) on localhost is closed in test environments.
        base_url: "http://127.0.0.1:9".into(),
        request_timeout_ms: 2_000,
        connect_timeout_ms: 1_000,
    };
    let transport = HttpTransport::new(&endpoint).unwrap();

    let err = transport.pull("shopping", None).await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}
