// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    path = { "/index.html", "/index.html", "/index.html" },
    query = { "/list?sort=name#top", "/list?sort=name", "/list" },
    absolute = { "https://pantry.example/app.js?v=2", "/app.js?v=2", "/app.js" },
    bare_origin = { "https://pantry.example", "/", "/" },
)]
fn request_target_and_path(url: &str, target: &str, path: &str) {
    let request = Request::get(url);
    assert_eq!(request.target(), target);
    assert_eq!(request.path(), path);
}

#[parameterized(
    shell = { "GET", "/index.html", Strategy::NetworkFirst },
    root = { "GET", "/", Strategy::NetworkFirst },
    sync_api = { "GET", "/sync?collection=shopping", Strategy::NetworkOnly },
    reference_api = { "GET", "https://pantry.example/reference/units", Strategy::NetworkOnly },
    lookalike = { "GET", "/synchronize.html", Strategy::NetworkFirst },
    post = { "POST", "/index.html", Strategy::NetworkOnly },
    lowercase_get = { "get", "/app.css", Strategy::NetworkFirst },
)]
fn strategy_by_request(method: &str, url: &str, expected: Strategy) {
    let request = Request {
        method: method.to_string(),
        ..Request::get(url)
    };
    assert_eq!(strategy(&request, &WorkerConfig::default()), expected);
}

#[test]
fn fallbacks_are_marked() {
    let unavailable = Response::unavailable();
    assert_eq!(unavailable.status, 503);
    assert_eq!(unavailable.source, ResponseSource::Fallback);

    let page = Response::builtin_offline_page();
    assert_eq!(page.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert!(page.text().contains("You are offline"));
}

#[test]
fn cached_round_trip_keeps_status_and_headers() {
    let response = Response {
        status: 200,
        headers: vec![("content-type".into(), "text/css".into())],
        body: b"body{}".to_vec(),
        source: ResponseSource::Network,
    };
    let restored = Response::from_cached(response.to_cached(Utc::now()));
    assert_eq!(restored.status, 200);
    assert_eq!(restored.body, response.body);
    assert_eq!(restored.header("content-type"), Some("text/css"));
    assert_eq!(restored.source, ResponseSource::Cache);
}

#[test]
fn http_fetcher_resolves_relative_urls() {
    let fetcher = HttpFetcher::new(&EndpointConfig {
        base_url: "http://localhost:8080/".into(),
        ..EndpointConfig::default()
    })
    .unwrap();
    assert_eq!(fetcher.resolve("/app.js"), "http://localhost:8080/app.js");
    assert_eq!(fetcher.resolve("https://cdn.example/x.js"), "https://cdn.example/x.js");
}
