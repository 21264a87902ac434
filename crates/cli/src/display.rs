// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use ofs_core::{FailedRequest, OfflineData, OfflineRequest};
use serde_json::Value;

/// Longest payload preview shown in text listings.
const PREVIEW_WIDTH: usize = 60;

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `1 request`, `2 requests`.
pub fn format_count(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Compact single-line JSON, cut to [`PREVIEW_WIDTH`] characters.
pub fn preview(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= PREVIEW_WIDTH {
        return text;
    }
    let cut: String = text.chars().take(PREVIEW_WIDTH - 3).collect();
    format!("{cut}...")
}

/// One pending request, e.g.
/// `client-c-1a2b3c [high] create client (queued 2026-01-01 10:00:00)`.
pub fn format_request_line(request: &OfflineRequest) -> String {
    let mut line = format!(
        "{} [{}] {} {} (queued {})",
        request.id,
        request.priority,
        request.operation,
        request.table,
        format_timestamp(&request.timestamp)
    );
    if request.retry_count > 0 {
        line.push_str(&format!(
            ", {} failed",
            format_count(request.retry_count as usize, "attempt")
        ));
    }
    if let Some(next) = &request.next_attempt_at {
        line.push_str(&format!(", next attempt {}", format_timestamp(next)));
    }
    if let Some(error) = &request.last_error {
        line.push_str(&format!("\n    last error: {error}"));
    }
    line
}

pub fn format_failed_line(failed: &FailedRequest) -> String {
    let reason = if failed.terminal {
        "rejected"
    } else {
        "exhausted"
    };
    format!(
        "{} {} {} ({} {})\n    {}",
        failed.request.id,
        failed.request.operation,
        failed.request.table,
        reason,
        format_timestamp(&failed.failed_at),
        failed.error
    )
}

pub fn format_cache_line(entry: &OfflineData) -> String {
    format!(
        "{}/{} ({}) {}",
        entry.table,
        entry.record_id,
        format_timestamp(&entry.timestamp),
        preview(&entry.data)
    )
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
