// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use ofs_core::{Operation, Priority};
use serde_json::json;
use yare::parameterized;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_261_600 + secs, 0).unwrap()
}

fn request() -> OfflineRequest {
    OfflineRequest {
        id: "client-c-abc123".into(),
        table: "client".into(),
        operation: Operation::Create,
        payload: json!({ "id": "c1" }),
        priority: Priority::High,
        timestamp: at(0),
        retry_count: 0,
        next_attempt_at: None,
        last_error: None,
    }
}

#[parameterized(
    zero = { 0, "0 requests" },
    one = { 1, "1 request" },
    many = { 12, "12 requests" },
)]
fn count_pluralizes(count: usize, expected: &str) {
    assert_eq!(format_count(count, "request"), expected);
}

#[test]
fn timestamp_is_second_precision() {
    assert_eq!(format_timestamp(&at(5)), "2026-01-01 10:00:05");
}

#[test]
fn short_payload_preview_is_untouched() {
    assert_eq!(preview(&json!({ "a": 1 })), r#"{"a":1}"#);
}

#[test]
fn long_payload_preview_is_cut() {
    let text = preview(&json!({ "notes": "x".repeat(200) }));
    assert_eq!(text.chars().count(), PREVIEW_WIDTH);
    assert!(text.ends_with("..."));
}

#[test]
fn fresh_request_line() {
    assert_eq!(
        format_request_line(&request()),
        "client-c-abc123 [high] create client (queued 2026-01-01 10:00:00)"
    );
}

#[test]
fn retried_request_line_shows_schedule_and_error() {
    let mut r = request();
    r.retry_count = 2;
    r.next_attempt_at = Some(at(4));
    r.last_error = Some("connection refused".into());

    assert_eq!(
        format_request_line(&r),
        "client-c-abc123 [high] create client (queued 2026-01-01 10:00:00), \
         2 attempts failed, next attempt 2026-01-01 10:00:04\n    last error: connection refused"
    );
}

#[parameterized(
    rejected = { true, "rejected" },
    exhausted = { false, "exhausted" },
)]
fn failed_line_names_reason(terminal: bool, reason: &str) {
    let failed = FailedRequest {
        request: request(),
        error: "name is required".into(),
        failed_at: at(60),
        terminal,
    };
    assert_eq!(
        format_failed_line(&failed),
        format!("client-c-abc123 create client ({reason} 2026-01-01 10:01:00)\n    name is required")
    );
}

#[test]
fn cache_line() {
    let entry = OfflineData::new("client", "c1", json!({ "id": "c1" }), at(0));
    assert_eq!(
        format_cache_line(&entry),
        r#"client/c1 (2026-01-01 10:00:00) {"id":"c1"}"#
    );
}
