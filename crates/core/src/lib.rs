// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ofs-core: Shared library for the ofsync offline engine
//!
//! This crate provides the data model, error taxonomy, configuration and
//! durable storage used by both the `ofsync` engine and the `ofsctl` tool.

pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod id;
pub mod request;
pub mod status;
pub mod store;

pub use clock::{ClockSource, ManualClock, MonotonicClock, SharedClock, SystemClock};
pub use config::{OfflineConfig, OverflowPolicy};
pub use data::{cache_key, record_id_of, OfflineData};
pub use error::{Error, Result, StorageError};
pub use request::{FailedRequest, NewRequest, OfflineRequest, Operation, Priority, RemoteCall};
pub use status::{EngineStatus, NetworkStatus, SyncReport, SyncStatus};
pub use store::{Collection, Document, Filter, Limits, MemoryStore, SqliteStore, Store};
