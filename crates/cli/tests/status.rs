// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

use serde_json::json;

#[test]
fn missing_store_is_an_error() {
    let ws = workspace();
    ws.cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("store not found"))
        .stderr(predicate::str::contains("hint:"));
    assert!(!ws.store.exists());
}

#[test]
fn counts_each_collection() {
    let ws = workspace();
    ws.add("create", "client", r#"{"id": "c1"}"#, "high");
    ws.add("update", "client", r#"{"id": "c2"}"#, "low");
    ws.add_rejected("invoice", r#"{"id": "i1"}"#, "amount is required");
    ws.cache("client", "c3", json!({ "id": "c3" }));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 2 requests"))
        .stdout(predicate::str::contains("failed: 1 request\n"))
        .stdout(predicate::str::contains("cached: 1 record\n"))
        .stdout(predicate::str::contains("amount is required"));
}

#[test]
fn json_output() {
    let ws = workspace();
    ws.add("create", "client", r#"{"id": "c1"}"#, "medium");

    let status: serde_json::Value = serde_json::from_str(&ws.stdout(&["status", "-o", "json"])).unwrap();
    assert_eq!(
        status,
        json!({
            "pending_requests": 1,
            "failed_requests": 0,
            "cached_records": 0,
            "sync_errors": [],
        })
    );
}

#[test]
fn store_can_come_from_environment() {
    let ws = workspace();
    ws.add("create", "client", r#"{"id": "c1"}"#, "medium");

    ofsctl()
        .env("OFSCTL_STORE", &ws.store)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 1 request\n"));
}
