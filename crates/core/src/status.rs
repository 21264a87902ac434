// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Status snapshots published to applications.
//!
//! All of these are projections: they can be rebuilt from the store and the
//! connectivity signal at any time and are never the source of truth for
//! queued writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known connectivity as seen by the network monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub is_online: bool,
    pub is_slow_connection: bool,
    pub last_online_time: Option<DateTime<Utc>>,
    pub last_offline_time: Option<DateTime<Utc>>,
}

impl NetworkStatus {
    /// Initial status for a host that reports `online` at `at`.
    pub fn initial(online: bool, at: DateTime<Utc>) -> Self {
        let mut status = NetworkStatus::default();
        if online {
            status.went_online(at);
        } else {
            status.went_offline(at);
        }
        status
    }

    /// Records a flip to online. Only `last_online_time` moves.
    pub fn went_online(&mut self, at: DateTime<Utc>) {
        self.is_online = true;
        self.last_online_time = Some(at);
    }

    /// Records a flip to offline. Only `last_offline_time` moves.
    pub fn went_offline(&mut self, at: DateTime<Utc>) {
        self.is_online = false;
        self.is_slow_connection = false;
        self.last_offline_time = Some(at);
    }
}

/// Queue health as maintained by the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub pending_requests: usize,
    pub failed_requests: usize,
    pub sync_errors: Vec<String>,
}

/// Outcome of one drain of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Requests replayed and removed from the queue.
    pub success: usize,
    /// Attempts that failed this pass, retryable or not. A retryable
    /// failure still within its retry budget stays queued and is counted
    /// here, not in `deferred`; `errors` lists only the requests that left
    /// the queue for good.
    pub failed: usize,
    /// Requests skipped this pass (backoff window or an earlier failure on
    /// the same table).
    pub deferred: usize,
    /// Messages for requests moved to the dead-letter list this pass.
    pub errors: Vec<String>,
    /// True when the pass stopped before reaching the end of its snapshot.
    pub aborted: bool,
}

impl SyncReport {
    /// True when nothing was rejected, exhausted, or abandoned.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }
}

/// Combined status for UI consumption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub network: NetworkStatus,
    pub sync: SyncStatus,
}

impl EngineStatus {
    /// Single-line summary such as `offline, 3 pending`.
    pub fn summary(&self) -> String {
        let mut parts = vec![if self.network.is_online {
            if self.network.is_slow_connection {
                "online (slow)"
            } else {
                "online"
            }
        } else {
            "offline"
        }
        .to_string()];
        if self.sync.is_syncing {
            parts.push("syncing".to_string());
        }
        if self.sync.pending_requests > 0 {
            parts.push(format!("{} pending", self.sync.pending_requests));
        }
        if self.sync.failed_requests > 0 {
            parts.push(format!("{} failed", self.sync.failed_requests));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
