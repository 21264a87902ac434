// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! [`NetworkMonitor`] combines the host's online flag ([`Connectivity`])
//! with periodic reachability probes into a debounced [`NetworkStatus`].
//! The decision logic lives in [`NetworkState`] so it can be exercised
//! without a runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ofs_core::{NetworkStatus, OfflineConfig, SharedClock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{Event, EventBus};
use crate::probe::{Probe, ProbeError};
use crate::shared::{config_of, lock, SharedConfig};

/// Host-supplied online flag.
///
/// Cloning yields another handle to the same flag; the host flips it from
/// its own connectivity callbacks.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Connectivity { tx: Arc::new(tx) }
    }

    /// Record a new host value. Repeating the current value is a no-op.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// An input to the status state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The host's flag changed.
    Host(bool),
    /// A probe completed after the given round trip.
    ProbeSucceeded(Duration),
    ProbeFailed,
}

/// Debounced status derived from host and probe signals.
#[derive(Debug, Clone)]
pub struct NetworkState {
    status: NetworkStatus,
    host_online: bool,
    probe_failures: u32,
}

impl NetworkState {
    pub fn new(host_online: bool, at: DateTime<Utc>) -> Self {
        NetworkState {
            status: NetworkStatus::initial(host_online, at),
            host_online,
            probe_failures: 0,
        }
    }

    pub fn status(&self) -> &NetworkStatus {
        &self.status
    }

    pub fn host_online(&self) -> bool {
        self.host_online
    }

    /// Apply one signal. Returns true if the visible status changed.
    ///
    /// The host going offline wins immediately. While the host says online,
    /// `failure_threshold` consecutive probe failures are needed to declare
    /// offline, and any later probe success restores online.
    pub fn apply(
        &mut self,
        signal: Signal,
        at: DateTime<Utc>,
        failure_threshold: u32,
        slow_threshold: Duration,
    ) -> bool {
        match signal {
            Signal::Host(online) => {
                self.host_online = online;
                self.probe_failures = 0;
                if online == self.status.is_online {
                    return false;
                }
                if online {
                    self.status.went_online(at);
                } else {
                    self.status.went_offline(at);
                }
                true
            }
            Signal::ProbeSucceeded(rtt) => {
                self.probe_failures = 0;
                if !self.host_online {
                    return false;
                }
                let slow = rtt > slow_threshold;
                let mut changed = false;
                if !self.status.is_online {
                    self.status.went_online(at);
                    changed = true;
                }
                if self.status.is_slow_connection != slow {
                    self.status.is_slow_connection = slow;
                    changed = true;
                }
                changed
            }
            Signal::ProbeFailed => {
                if !self.host_online || !self.status.is_online {
                    return false;
                }
                self.probe_failures = self.probe_failures.saturating_add(1);
                if self.probe_failures < failure_threshold.max(1) {
                    return false;
                }
                self.status.went_offline(at);
                true
            }
        }
    }
}

struct MonitorInner {
    connectivity: Connectivity,
    probe: Arc<dyn Probe>,
    bus: Arc<EventBus>,
    clock: SharedClock,
    config: SharedConfig,
    state: Mutex<NetworkState>,
    status_tx: watch::Sender<NetworkStatus>,
}

impl MonitorInner {
    fn apply(&self, signal: Signal) -> NetworkStatus {
        let config = config_of(&self.config);
        let at = self.clock.now();
        let (changed, status) = {
            let mut state = lock(&self.state);
            let changed = state.apply(
                signal,
                at,
                config.probe_failure_threshold,
                config.slow_threshold(),
            );
            (changed, state.status().clone())
        };
        if changed {
            if !status.is_online {
                warn!(?signal, "network offline");
            } else if status.is_slow_connection {
                warn!(?signal, "network slow");
            } else {
                info!(?signal, "network online");
            }
            self.status_tx.send_replace(status.clone());
            self.bus.emit(Event::NetworkStatusChanged(status.clone()));
        }
        status
    }

    async fn probe_once(&self) -> NetworkStatus {
        let timeout = config_of(&self.config).probe_timeout();
        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, self.probe.probe()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout),
        };
        match result {
            Ok(()) => self.apply(Signal::ProbeSucceeded(started.elapsed())),
            Err(e) => {
                debug!(error = %e, "reachability probe failed");
                self.apply(Signal::ProbeFailed)
            }
        }
    }

    fn host_online(&self) -> bool {
        lock(&self.state).host_online()
    }
}

/// Owner of the connectivity status; the only source of online/offline
/// transitions.
pub struct NetworkMonitor {
    inner: Arc<MonitorInner>,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl NetworkMonitor {
    pub fn new(
        connectivity: Connectivity,
        probe: Arc<dyn Probe>,
        bus: Arc<EventBus>,
        clock: SharedClock,
        config: SharedConfig,
    ) -> Self {
        let state = NetworkState::new(connectivity.is_online(), clock.now());
        let (status_tx, _) = watch::channel(state.status().clone());
        NetworkMonitor {
            inner: Arc::new(MonitorInner {
                connectivity,
                probe,
                bus,
                clock,
                config,
                state: Mutex::new(state),
                status_tx,
            }),
            task: Mutex::new(None),
        }
    }

    /// Last-known status.
    pub fn status(&self) -> NetworkStatus {
        lock(&self.inner.state).status().clone()
    }

    pub fn is_online(&self) -> bool {
        lock(&self.inner.state).status().is_online
    }

    /// A receiver that observes every status change.
    pub fn watch(&self) -> watch::Receiver<NetworkStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.inner.connectivity
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task).is_some()
    }

    /// Run one probe now, outside the periodic schedule.
    pub async fn probe_now(&self) -> NetworkStatus {
        self.inner.probe_once().await
    }

    /// Start watching the host flag and probing. Calling it again while
    /// running does nothing. Must be called inside a tokio runtime.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if task.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_monitor(Arc::clone(&self.inner), cancel.clone()));
        *task = Some((cancel, handle));
        info!("network monitor started");
    }

    /// Stop the background task and wait for it to exit.
    pub async fn stop(&self) {
        let task = lock(&self.task).take();
        if let Some((cancel, handle)) = task {
            cancel.cancel();
            let _ = handle.await;
            info!("network monitor stopped");
        }
    }

    /// Restart debouncing after a config change. Thresholds and probe timing
    /// are read live from the shared config.
    pub fn reconfigure(&self, config: &OfflineConfig) {
        debug!(
            probe_interval_ms = config.probe_interval_ms,
            failure_threshold = config.probe_failure_threshold,
            "network monitor reconfigured"
        );
        let host = self.inner.host_online();
        self.inner.apply(Signal::Host(host));
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        if let Some((cancel, _)) = lock(&self.task).take() {
            cancel.cancel();
        }
    }
}

async fn run_monitor(inner: Arc<MonitorInner>, cancel: CancellationToken) {
    let mut host = inner.connectivity.subscribe();
    let online = *host.borrow_and_update();
    inner.apply(Signal::Host(online));

    let mut next_probe = Instant::now();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = host.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *host.borrow_and_update();
                inner.apply(Signal::Host(online));
                if online {
                    // Confirm reachability right away rather than at the next tick.
                    next_probe = Instant::now();
                }
            }
            _ = tokio::time::sleep_until(next_probe) => {
                if inner.host_online() {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = inner.probe_once() => {}
                    }
                }
                next_probe = Instant::now() + config_of(&inner.config).probe_interval();
            }
        }
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
