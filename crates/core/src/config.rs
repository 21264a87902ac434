// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Every field has a default, so a partial TOML file (or none at all) is a
//! valid configuration:
//!
//! ```toml
//! max_retries = 5
//! retry_delay_ms = 2000
//! overflow_policy = "drop_oldest_low"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::Limits;

/// What to do when a request arrives and the queue is already full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail the enqueue with `CapacityExceeded`.
    #[default]
    Reject,
    /// Evict the oldest low-priority request to make room; reject if there
    /// is none.
    DropOldestLow,
}

/// Offline engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Retries allowed per request before it moves to the dead-letter list.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay; doubles with every failed attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Maximum number of pending requests.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Background sync period.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Return locally computed results before the server confirms them.
    #[serde(default = "default_true")]
    pub enable_optimistic_updates: bool,
    /// Periodically sync while online, independent of connectivity events.
    #[serde(default = "default_true")]
    pub enable_background_sync: bool,
    /// Byte budget for the record cache.
    #[serde(default = "default_storage_quota")]
    pub storage_quota: u64,
    /// Deliver events to subscribers. Internal status is kept either way.
    #[serde(default = "default_true")]
    pub enable_notifications: bool,

    /// Interval between reachability probes.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Time after which a probe counts as failed.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Probe round trips above this mark the connection as slow.
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
    /// Consecutive probe failures needed to declare offline while the host
    /// still reports online.
    #[serde(default = "default_probe_failure_threshold")]
    pub probe_failure_threshold: u32,
    /// Upper bound for the exponential backoff.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Size of the dead-letter list; the oldest entries are evicted.
    #[serde(default = "default_max_dead_letters")]
    pub max_dead_letters: usize,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    /// Consecutive retryable failures after which a sync pass stops early.
    #[serde(default = "default_abort_after_failures")]
    pub abort_after_failures: u32,
    /// Buffer size of the event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_max_queue_size() -> usize {
    100
}

fn default_sync_interval_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_storage_quota() -> u64 {
    50 * 1024 * 1024
}

fn default_probe_interval_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_slow_threshold_ms() -> u64 {
    2_000
}

fn default_probe_failure_threshold() -> u32 {
    2
}

fn default_max_retry_delay_ms() -> u64 {
    300_000
}

fn default_max_dead_letters() -> usize {
    100
}

fn default_abort_after_failures() -> u32 {
    3
}

fn default_event_capacity() -> usize {
    256
}

impl Default for OfflineConfig {
    fn default() -> Self {
        OfflineConfig {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_queue_size: default_max_queue_size(),
            sync_interval_ms: default_sync_interval_ms(),
            enable_optimistic_updates: true,
            enable_background_sync: true,
            storage_quota: default_storage_quota(),
            enable_notifications: true,
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            slow_threshold_ms: default_slow_threshold_ms(),
            probe_failure_threshold: default_probe_failure_threshold(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            max_dead_letters: default_max_dead_letters(),
            overflow_policy: OverflowPolicy::default(),
            abort_after_failures: default_abort_after_failures(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl OfflineConfig {
    /// Loads and validates a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("failed to read config: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: OfflineConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("failed to serialize config: {}", e)))
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("max_queue_size", self.max_queue_size as u64),
            ("sync_interval_ms", self.sync_interval_ms),
            ("probe_interval_ms", self.probe_interval_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("probe_failure_threshold", u64::from(self.probe_failure_threshold)),
            ("max_dead_letters", self.max_dead_letters as u64),
            ("abort_after_failures", u64::from(self.abort_after_failures)),
            ("event_capacity", self.event_capacity as u64),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(Error::InvalidConfig(format!("{field} must be greater than zero")));
        }
        if self.max_retry_delay_ms < self.retry_delay_ms {
            return Err(Error::InvalidConfig(
                "max_retry_delay_ms must be at least retry_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Store bounds derived from this configuration.
    pub fn limits(&self) -> Limits {
        Limits {
            max_queue_size: self.max_queue_size,
            storage_quota: self.storage_quota,
            max_dead_letters: self.max_dead_letters,
        }
    }

    /// Backoff before the next attempt of a request that has failed
    /// `retry_count` times: `retry_delay * 2^(retry_count - 1)`, capped at
    /// `max_retry_delay`.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(32);
        let delay = self.retry_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_retry_delay_ms))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
