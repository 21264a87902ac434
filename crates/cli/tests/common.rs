// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use chrono::Utc;
use ofs_core::{Collection, Document, OfflineConfig, OfflineData, SqliteStore, Store, SystemClock};
use ofsync::{shared_config, shared_store, EventBus, RequestQueue};
use serde_json::Value;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub fn ofsctl() -> Command {
    let mut cmd = cargo_bin_cmd!("ofsctl");
    cmd.env_remove("OFSCTL_STORE").env_remove("OFSCTL_CONFIG");
    cmd
}

/// A temp directory holding one store.
pub struct Workspace {
    pub dir: TempDir,
    pub store: PathBuf,
}

pub fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("offline.db");
    Workspace { dir, store }
}

impl Workspace {
    /// `ofsctl --store <this store>`.
    pub fn cmd(&self) -> Command {
        let mut cmd = ofsctl();
        cmd.arg("--store").arg(&self.store);
        cmd
    }

    /// Queue a request through the CLI and return its id.
    pub fn add(&self, operation: &str, table: &str, payload: &str, priority: &str) -> String {
        let output = self
            .cmd()
            .args(["queue", "add", operation, table, payload, "-p", priority])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .nth(1)
            .unwrap()
            .to_string()
    }

    fn queue(&self) -> RequestQueue<SqliteStore> {
        let config = OfflineConfig::default();
        let store = SqliteStore::open(&self.store, config.limits()).unwrap();
        RequestQueue::new(
            shared_store(store),
            Arc::new(EventBus::new(1)),
            Arc::new(SystemClock),
            shared_config(config),
        )
        .unwrap()
    }

    /// Queue a request and have it rejected, as a sync would.
    pub fn add_rejected(&self, table: &str, payload: &str, error: &str) -> String {
        let id = self.add("create", table, payload, "medium");
        self.queue().mark_rejected(&id, error).unwrap();
        id
    }

    pub fn cache(&self, table: &str, record_id: &str, data: Value) {
        let entry = OfflineData::new(table, record_id, data, Utc::now());
        let doc = Document::from_record(entry.id.clone(), table, entry.timestamp, &entry).unwrap();
        let mut store = SqliteStore::open(&self.store, OfflineConfig::default().limits()).unwrap();
        store.insert(Collection::Cache, doc).unwrap();
    }

    pub fn stdout(&self, args: &[&str]) -> String {
        let output = self.cmd().args(args).output().unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout).into_owned()
    }
}
