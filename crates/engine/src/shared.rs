// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Handles shared between engine components.
//!
//! Both locks are synchronous and only ever held for the duration of a store
//! call or a config read, never across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use ofs_core::OfflineConfig;

/// Store handle shared by the queue and the cache path.
pub type SharedStore<S> = Arc<Mutex<S>>;

/// Live configuration; replaced wholesale by `update_config`.
pub type SharedConfig = Arc<RwLock<OfflineConfig>>;

pub fn shared_store<S>(store: S) -> SharedStore<S> {
    Arc::new(Mutex::new(store))
}

pub fn shared_config(config: OfflineConfig) -> SharedConfig {
    Arc::new(RwLock::new(config))
}

pub(crate) fn lock<S>(store: &Mutex<S>) -> MutexGuard<'_, S> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Current configuration snapshot.
pub(crate) fn config_of(config: &RwLock<OfflineConfig>) -> OfflineConfig {
    config
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub(crate) fn replace_config(config: &RwLock<OfflineConfig>, next: OfflineConfig) {
    *config.write().unwrap_or_else(PoisonError::into_inner) = next;
}
