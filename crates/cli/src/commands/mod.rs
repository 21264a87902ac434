// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cache;
pub mod config;
pub mod dead;
pub mod queue;
pub mod status;

use std::sync::Arc;

use ofs_core::{OfflineConfig, SqliteStore, SystemClock};
use ofsync::{shared_config, shared_store, EventBus, RequestQueue};
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::error::{Error, Result};

/// The configuration named by `--config`, or the defaults.
pub fn load_config(global: &GlobalArgs) -> Result<OfflineConfig> {
    match &global.config {
        Some(path) => Ok(OfflineConfig::load(path)?),
        None => Ok(OfflineConfig::default()),
    }
}

/// Open the store named by `--store`. Inspection commands refuse to create
/// a new store; `create` allows it.
pub fn open_store(global: &GlobalArgs, config: &OfflineConfig, create: bool) -> Result<SqliteStore> {
    if !create && !global.store.exists() {
        return Err(Error::StoreNotFound(global.store.display().to_string()));
    }
    debug!(path = %global.store.display(), "opening store");
    Ok(SqliteStore::open(&global.store, config.limits())?)
}

/// Open the store as a request queue.
pub fn open_queue(global: &GlobalArgs, create: bool) -> Result<RequestQueue<SqliteStore>> {
    let config = load_config(global)?;
    let store = open_store(global, &config, create)?;
    let queue = RequestQueue::new(
        shared_store(store),
        Arc::new(EventBus::new(1)),
        Arc::new(SystemClock),
        shared_config(config),
    )?;
    Ok(queue)
}

/// Print `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
