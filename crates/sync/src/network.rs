// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity state machine.
//!
//! ```text
//!            Reachable (arms debounce)
//!   Offline ───────────────────────────► Online
//!      ▲                                   │
//!      └───────────── Unreachable ─────────┘
//!                  (disarms debounce)
//! ```
//!
//! A sync is triggered once the link has stayed up for the whole debounce
//! window. The machine is pure: callers pass the current instant in, which
//! keeps it testable without timers.

use std::time::Duration;
use tokio::time::Instant;

/// Raw reachability signal from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Reachable,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Offline,
    Online,
}

/// What a signal did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
    Unchanged,
}

/// Time to run a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTrigger;

#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    state: NetworkState,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl NetworkMonitor {
    /// A monitor that starts offline.
    pub fn new(debounce: Duration) -> Self {
        NetworkMonitor {
            state: NetworkState::Offline,
            debounce,
            deadline: None,
        }
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == NetworkState::Online
    }

    /// When the armed trigger fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn handle(&mut self, signal: Connectivity, now: Instant) -> Transition {
        match (self.state, signal) {
            (NetworkState::Offline, Connectivity::Reachable) => {
                self.state = NetworkState::Online;
                self.deadline = Some(now + self.debounce);
                tracing::info!("network reachable, sync in {:?}", self.debounce);
                Transition::WentOnline
            }
            (NetworkState::Online, Connectivity::Unreachable) => {
                self.state = NetworkState::Offline;
                self.deadline = None;
                tracing::info!("network unreachable");
                Transition::WentOffline
            }
            _ => Transition::Unchanged,
        }
    }

    /// Fire the trigger if the debounce window has fully elapsed.
    ///
    /// Yields at most once per `Offline → Online` transition.
    pub fn poll(&mut self, now: Instant) -> Option<SyncTrigger> {
        match self.deadline {
            Some(deadline) if self.is_online() && now >= deadline => {
                self.deadline = None;
                Some(SyncTrigger)
            }
            _ => None,
        }
    }

    /// A local mutation happened. Syncs right away when online and no
    /// debounced trigger is already pending.
    pub fn on_mutation(&self) -> Option<SyncTrigger> {
        (self.is_online() && self.deadline.is_none()).then_some(SyncTrigger)
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
