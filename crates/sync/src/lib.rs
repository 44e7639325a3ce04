// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pantry-sync: the networked half of the pantry sync engine
//!
//! Builds on `pantry-core` with the HTTP transport, the synchronize cycle,
//! connectivity handling and the background worker.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod network;
pub mod notice;
pub mod transport;
pub mod worker;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
#[path = "integration_tests.rs"]
mod integration_tests;

pub use config::{EndpointConfig, SyncConfig, WorkerConfig};
pub use coordinator::SyncCoordinator;
pub use engine::{EngineStatus, SyncEngine};
pub use error::{Error, Result};
pub use network::{Connectivity, NetworkMonitor, NetworkState, SyncTrigger, Transition};
pub use notice::Notice;
pub use transport::{HttpTransport, Transport, TransportError, TransportResult};
pub use worker::fetch::{Fetcher, HttpFetcher, Request, Response};
pub use worker::{BackgroundWorker, Headless, Platform, WorkerHandle, WorkerState};
