// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ofsync: offline-aware request/sync engine
//!
//! Lets an application keep issuing mutations while the network is absent
//! or degraded. Mutations that cannot complete are queued durably and
//! replayed in priority order once connectivity returns.
//!
//! ## Architecture
//!
//! ```text
//! OfflineFacade ──perform──▶ Transport (online)
//!      │
//!      └──queue_request──▶ RequestQueue ──▶ Store (ofs-core)
//!                              ▲
//! NetworkMonitor ──watch──▶ SyncEngine ──replay──▶ Transport
//!      │                       │
//!      └────────── EventBus ◀──┘
//! ```
//!
//! - [`NetworkMonitor`] combines a host connectivity flag with periodic
//!   probes into a debounced [`NetworkStatus`](ofs_core::NetworkStatus).
//! - [`RequestQueue`] persists pending mutations and tracks retries.
//! - [`SyncEngine`] drains the queue, one drain at a time.
//! - [`EventBus`] fans typed [`Event`]s out to subscribers.
//! - [`OfflineFacade`] is the entry point applications hold.

pub mod engine;
pub mod events;
pub mod facade;
pub mod network;
pub mod probe;
pub mod queue;
pub mod shared;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use engine::{SyncEngine, SyncState};
pub use events::{Event, EventBus, EventKind, ListenerId};
pub use facade::{FacadeBuilder, OfflineFacade, PerformOutcome};
pub use network::{Connectivity, NetworkMonitor, NetworkState, Signal};
pub use probe::{NoProbe, Probe, ProbeError, TcpProbe};
pub use queue::{FailureOutcome, RequestQueue};
pub use shared::{shared_config, shared_store, SharedConfig, SharedStore};
pub use transport::{
    BoxFuture, Classifier, DefaultClassifier, ErrorClass, RemoteRecord, Transport,
    TransportError, TransportResult,
};
