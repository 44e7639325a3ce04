// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the sync server's HTTP API.
//!
//! Provides a trait-based transport layer that enables:
//! - A reqwest client for production
//! - In-memory servers for unit and end-to-end tests

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use pantry_core::{PullResponse, PushAck, PushRequest};
use serde_json::Value;

use crate::config::EndpointConfig;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response within the allotted time.
    #[error("request timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A success response whose body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// The status code if the server refused the request outright.
    ///
    /// Every 4xx except 408 (request timeout) and 429 (too many requests).
    pub fn rejection(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. }
                if (400..500).contains(status) && *status != 408 && *status != 429 =>
            {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Returns true if trying again later may succeed.
    pub fn is_transient(&self) -> bool {
        self.rejection().is_none()
    }

    /// Human-readable reason for a failed change.
    pub fn reason(&self) -> String {
        match self {
            TransportError::Status { body, status } if !body.trim().is_empty() => {
                format!("{status}: {}", body.trim())
            }
            other => other.to_string(),
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// The three calls the engine makes against the server.
///
/// This trait abstracts over the actual HTTP client, allowing for easy
/// testing with in-memory implementations.
pub trait Transport: Send + Sync {
    /// `POST /sync` with one change.
    fn push(&self, request: PushRequest) -> TransportFuture<'_, PushAck>;

    /// `GET /sync?since=…&collection=…`. `since = None` asks for everything.
    fn pull(&self, collection: &str, since: Option<DateTime<Utc>>)
        -> TransportFuture<'_, PullResponse>;

    /// `GET /reference/{key}`.
    fn fetch_reference(&self, key: &str) -> TransportFuture<'_, Value>;
}

/// Transport over HTTP using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the configured endpoint.
    pub fn new(endpoint: &EndpointConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(endpoint.connect_timeout_ms))
            .timeout(Duration::from_millis(endpoint.request_timeout_ms))
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(HttpTransport {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn from_reqwest(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::InvalidResponse(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

/// Turn a non-success status into an error carrying the response body.
async fn check_status(response: reqwest::Response) -> TransportResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

impl Transport for HttpTransport {
    fn push(&self, request: PushRequest) -> TransportFuture<'_, PushAck> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("/sync"))
                .json(&request)
                .send()
                .await
                .map_err(from_reqwest)?;
            let bytes = check_status(response)
                .await?
                .bytes()
                .await
                .map_err(from_reqwest)?;

            // Some servers answer 204 with no body; the change is still applied.
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(PushAck::default());
            }
            serde_json::from_slice(&bytes).map_err(|e| TransportError::InvalidResponse(e.to_string()))
        })
    }

    fn pull(
        &self,
        collection: &str,
        since: Option<DateTime<Utc>>,
    ) -> TransportFuture<'_, PullResponse> {
        let mut query = vec![("collection", collection.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
        }
        Box::pin(async move {
            let response = self
                .client
                .get(self.url("/sync"))
                .query(&query)
                .send()
                .await
                .map_err(from_reqwest)?;
            check_status(response)
                .await?
                .json::<PullResponse>()
                .await
                .map_err(from_reqwest)
        })
    }

    fn fetch_reference(&self, key: &str) -> TransportFuture<'_, Value> {
        let url = self.url(&format!("/reference/{key}"));
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(from_reqwest)?;
            check_status(response)
                .await?
                .json::<Value>()
                .await
                .map_err(from_reqwest)
        })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
