// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Requests seen by the worker, and how each one is answered.
//!
//! GET requests for the app shell are network-first with a cache fallback.
//! Sync and reference API calls bypass the cache entirely, as does every
//! non-GET request. When the network is gone, a navigation gets the offline
//! page and anything else gets a 503.

use chrono::{DateTime, Utc};
use pantry_core::db::CachedResponse;
use std::time::Duration;

use crate::config::{EndpointConfig, WorkerConfig};
use crate::transport::{TransportError, TransportFuture};

/// Page served to navigations when neither the network nor the cache can.
pub const BUILTIN_OFFLINE_PAGE: &str = "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
<title>Offline</title></head><body><h1>You are offline</h1>\
<p>Your changes are saved and will sync when the connection returns.</p></body></html>\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// A top-level page load.
    Navigate,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Absolute URL or origin-relative path.
    pub url: String,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: "GET".to_string(),
            url: url.into(),
            mode: RequestMode::Other,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Request {
            mode: RequestMode::Navigate,
            ..Request::get(url)
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Request {
            method: "POST".to_string(),
            body: body.into(),
            ..Request::get(url)
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Path and query, without origin or fragment. Used as the cache key.
    pub fn target(&self) -> &str {
        let target = strip_origin(&self.url);
        target.split('#').next().unwrap_or(target)
    }

    /// Path only.
    pub fn path(&self) -> &str {
        let target = self.target();
        target.split('?').next().unwrap_or(target)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Synthesized because nothing better was available.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// 503 for a request that needed the network.
    pub fn unavailable() -> Self {
        Response {
            status: 503,
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: b"offline".to_vec(),
            source: ResponseSource::Fallback,
        }
    }

    pub fn builtin_offline_page() -> Self {
        Response {
            status: 503,
            headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
            body: BUILTIN_OFFLINE_PAGE.as_bytes().to_vec(),
            source: ResponseSource::Fallback,
        }
    }

    pub(crate) fn from_cached(cached: CachedResponse) -> Self {
        Response {
            status: cached.status,
            headers: cached.headers,
            body: cached.body,
            source: ResponseSource::Cache,
        }
    }

    pub(crate) fn to_cached(&self, now: DateTime<Utc>) -> CachedResponse {
        CachedResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            stored_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkOnly,
    NetworkFirst,
}

/// Pick how a request is served.
pub fn strategy(request: &Request, config: &WorkerConfig) -> Strategy {
    if !request.is_get() {
        return Strategy::NetworkOnly;
    }
    let path = request.path();
    let bypass = config.bypass_prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
    });
    if bypass {
        Strategy::NetworkOnly
    } else {
        Strategy::NetworkFirst
    }
}

/// Drop `scheme://host[:port]` from a URL, leaving at least `/`.
pub(crate) fn strip_origin(url: &str) -> &str {
    let Some((_, rest)) = url.split_once("://") else {
        return url;
    };
    match rest.find('/') {
        Some(i) => &rest[i..],
        None => "/",
    }
}

/// Performs requests on behalf of the worker.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &Request) -> TransportFuture<'_, Response>;
}

/// [`Fetcher`] over reqwest, resolving relative URLs against the endpoint.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(endpoint.connect_timeout_ms))
            .timeout(Duration::from_millis(endpoint.request_timeout_ms))
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(HttpFetcher {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else {
            format!("{}{url}", self.base_url)
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &Request) -> TransportFuture<'_, Response> {
        let url = self.resolve(&request.url);
        let request = request.clone();
        Box::pin(async move {
            let method = reqwest::Method::from_bytes(request.method.as_bytes())
                .map_err(|e| TransportError::InvalidResponse(format!("bad method: {e}")))?;
            let mut builder = self.client.request(method, url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if !request.body.is_empty() {
                builder = builder.body(request.body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Connection(e.to_string()))?
                .to_vec();
            Ok(Response {
                status,
                headers,
                body,
                source: ResponseSource::Network,
            })
        })
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
