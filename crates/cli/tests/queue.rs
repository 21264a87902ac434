// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

fn seed(ws: &Workspace) -> Vec<String> {
    vec![
        ws.add("create", "client", r#"{"id": "c1"}"#, "low"),
        ws.add("create", "invoice", r#"{"id": "i1"}"#, "high"),
        ws.add("update", "client", r#"{"id": "c1", "name": "Acme"}"#, "medium"),
        ws.add("delete", "client", r#"{"id": "c0"}"#, "high"),
    ]
}

#[test]
fn list_is_in_replay_order() {
    let ws = workspace();
    let ids = seed(&ws);

    let stdout = ws.stdout(&["queue", "list"]);
    let listed: Vec<&str> = stdout
        .lines()
        .map(|line| line.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(listed, vec![&ids[1], &ids[3], &ids[2], &ids[0]]);
    assert!(stdout.contains("[high] delete client"));
}

#[test]
fn list_filters_by_table() {
    let ws = workspace();
    seed(&ws);

    let stdout = ws.stdout(&["queue", "list", "--table", "invoice"]);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("create invoice"));
}

#[test]
fn list_json_round_trips_requests() {
    let ws = workspace();
    let ids = seed(&ws);

    let requests: Vec<serde_json::Value> =
        serde_json::from_str(&ws.stdout(&["queue", "list", "-o", "json"])).unwrap();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0]["id"], ids[1].as_str());
    assert_eq!(requests[0]["priority"], "high");
    assert_eq!(requests[0]["retry_count"], 0);
}

#[test]
fn empty_queue_says_so() {
    let ws = workspace();
    ws.add("create", "client", "{}", "medium");
    ws.cmd().args(["queue", "clear"]).assert().success();

    ws.cmd()
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout("No pending requests.\n");
}

#[test]
fn clear_by_table() {
    let ws = workspace();
    seed(&ws);

    ws.cmd()
        .args(["queue", "clear", "-t", "client"])
        .assert()
        .success()
        .stdout("Cleared 3 requests\n");
    assert_eq!(ws.stdout(&["queue", "list"]).lines().count(), 1);
}

#[test]
fn add_rejects_bad_input() {
    let ws = workspace();
    ws.cmd()
        .args(["queue", "add", "upsert", "client", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid operation: 'upsert'"));
    ws.cmd()
        .args(["queue", "add", "create", "client", "{}", "-p", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("valid priorities are"));
    ws.cmd()
        .args(["queue", "add", "create", "client", "[]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid payload"));
}

#[test]
fn full_queue_rejects_add() {
    let ws = workspace();
    let config = ws.dir.path().join("ofs.toml");
    std::fs::write(&config, "max_queue_size = 1\n").unwrap();
    ws.add("create", "client", "{}", "medium");

    ws.cmd()
        .arg("--config")
        .arg(&config)
        .args(["queue", "add", "create", "client", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("queue is full (limit 1)"));
}
