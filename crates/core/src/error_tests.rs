// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    network = { Error::Network("reset".into()), "reset" },
    not_initialized = { Error::NotInitialized, "init()" },
    capacity = { Error::CapacityExceeded { collection: "queue", limit: 5 }, "limit 5" },
    priority = { Error::InvalidPriority("urgent".into()), "high, medium, low" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[parameterized(
    network = { Error::Network("x".into()), true, false },
    timeout = { Error::Timeout("x".into()), true, false },
    validation = { Error::Validation("x".into()), false, true },
    conflict = { Error::Conflict("x".into()), false, true },
    rejected = { Error::Rejected { status: 404, message: "gone".into() }, false, true },
    capacity = { Error::CapacityExceeded { collection: "queue", limit: 1 }, false, false },
    not_initialized = { Error::NotInitialized, false, false },
)]
fn error_classification(err: Error, retryable: bool, terminal: bool) {
    assert_eq!(err.is_retryable(), retryable);
    assert_eq!(err.is_terminal(), terminal);
}

#[test]
fn error_from_io_is_storage() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Storage(StorageError::Io(_))));
}

#[test]
fn error_from_json_is_storage() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Storage(StorageError::Json(_))));
}
