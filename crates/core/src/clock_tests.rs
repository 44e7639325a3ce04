// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn manual_clock_is_frozen_until_advanced() {
    let clock = ManualClock::new(start());
    assert_eq!(clock.now(), start());
    assert_eq!(clock.now(), start());

    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now(), start() + Duration::seconds(90));
}

#[test]
fn manual_clock_set_jumps() {
    let clock = ManualClock::new(start());
    let later = start() + Duration::days(2);
    clock.set(later);
    assert_eq!(clock.now_ms(), later.timestamp_millis());
}

#[test]
fn arc_and_ref_delegate() {
    let clock = Arc::new(ManualClock::new(start()));
    let by_ref = &*clock;
    assert_eq!(by_ref.now(), clock.now());

    let shared: Arc<dyn ClockSource> = clock.clone();
    clock.advance(Duration::milliseconds(5));
    assert_eq!(shared.now_ms(), start().timestamp_millis() + 5);
}

#[test]
fn system_clock_is_close_to_now() {
    let before = Utc::now().timestamp_millis();
    let now = SystemClock.now_ms();
    let after = Utc::now().timestamp_millis();
    assert!(now >= before && now <= after);
}
