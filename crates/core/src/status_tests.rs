// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::{Duration, TimeZone};

#[test]
fn flips_touch_only_their_own_timestamp() {
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let t1 = t0 + Duration::seconds(10);
    let t2 = t1 + Duration::seconds(10);

    let mut status = NetworkStatus::initial(true, t0);
    assert_eq!(status.last_online_time, Some(t0));
    assert_eq!(status.last_offline_time, None);

    status.went_offline(t1);
    assert!(!status.is_online);
    assert_eq!(status.last_online_time, Some(t0));
    assert_eq!(status.last_offline_time, Some(t1));

    status.went_online(t2);
    assert!(status.is_online);
    assert_eq!(status.last_online_time, Some(t2));
    assert_eq!(status.last_offline_time, Some(t1));
}

#[test]
fn going_offline_clears_slow_flag() {
    let mut status = NetworkStatus::initial(true, Utc::now());
    status.is_slow_connection = true;
    status.went_offline(Utc::now());
    assert!(!status.is_slow_connection);
}

#[test]
fn report_is_clean() {
    let mut report = SyncReport {
        success: 2,
        failed: 1,
        ..Default::default()
    };
    assert!(report.is_clean());

    report.errors.push("client-1: rejected".into());
    assert!(!report.is_clean());

    let aborted = SyncReport {
        aborted: true,
        ..Default::default()
    };
    assert!(!aborted.is_clean());
}

#[test]
fn engine_status_summary() {
    let mut status = EngineStatus::default();
    assert_eq!(status.summary(), "offline");

    status.network.is_online = true;
    status.sync.pending_requests = 3;
    status.sync.is_syncing = true;
    assert_eq!(status.summary(), "online, syncing, 3 pending");

    status.network.is_slow_connection = true;
    status.sync.is_syncing = false;
    status.sync.failed_requests = 1;
    assert_eq!(status.summary(), "online (slow), 3 pending, 1 failed");
}
