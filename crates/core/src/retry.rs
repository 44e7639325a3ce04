// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-change retry scheduling with exponential backoff.
//!
//! `delay(attempt) = min(base * 2^attempt, max_delay) + jitter`, where the
//! jitter is uniform in `[0, jitter * delay]`. Once a change reaches
//! `max_attempts` it is escalated to a failed change and never retried
//! automatically.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::change::{FailOutcome, FailedChange};
use crate::db::Store;
use crate::error::Result;

/// Backoff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Base delay (milliseconds).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the un-jittered delay (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Attempts before a change is escalated.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Jitter as a fraction of the delay (0.0 disables it).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    8 * default_base_delay_ms()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay before the next try after `attempt` failures.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Delay with jitter applied.
    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        if self.jitter <= 0.0 {
            return backoff;
        }
        let spread = backoff.as_millis() as f64 * self.jitter;
        let extra = rand::thread_rng().gen_range(0.0..=spread);
        backoff + Duration::from_millis(extra as u64)
    }
}

/// What happened to a change after a transient failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Will be pushed again once `next_attempt_at` passes.
    Retry {
        change_id: i64,
        attempt: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Out of attempts; now a failed change.
    Escalated(FailedChange),
}

/// Applies a [`RetryPolicy`] to queued changes.
#[derive(Debug, Clone, Default)]
pub struct RetryScheduler {
    policy: RetryPolicy,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryScheduler { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Records a transient failure and schedules the next attempt.
    pub fn on_failure(
        &self,
        store: &Store,
        change_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<RetryDecision> {
        match store.fail(change_id, reason, self.policy.max_attempts, now)? {
            FailOutcome::Escalated(failed) => {
                tracing::error!(
                    change_id,
                    entity_id = %failed.entity_id,
                    attempts = failed.attempt_count,
                    "change escalated after exhausting retries: {reason}"
                );
                Ok(RetryDecision::Escalated(failed))
            }
            FailOutcome::Pending(change) => {
                let delay = self.policy.delay(change.attempt_count);
                let next_attempt_at = chrono::Duration::from_std(delay)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                store.schedule_retry(change_id, next_attempt_at)?;
                tracing::warn!(
                    change_id,
                    attempt = change.attempt_count,
                    delay_ms = delay.as_millis() as u64,
                    "push failed, will retry: {reason}"
                );
                Ok(RetryDecision::Retry {
                    change_id,
                    attempt: change.attempt_count,
                    next_attempt_at,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
