// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::events::EventKind;
use crate::shared::shared_config;
use crate::test_helpers::{epoch, manual_clock, MockProbe};
use yare::parameterized;

const SLOW: Duration = Duration::from_secs(2);

fn apply_all(state: &mut NetworkState, signals: &[Signal]) -> Vec<bool> {
    signals
        .iter()
        .map(|signal| state.apply(*signal, epoch(), 2, SLOW))
        .collect()
}

#[test]
fn host_offline_flips_immediately() {
    let mut state = NetworkState::new(true, epoch());
    assert_eq!(apply_all(&mut state, &[Signal::Host(false)]), vec![true]);
    assert!(!state.status().is_online);
    assert_eq!(state.status().last_offline_time, Some(epoch()));
}

#[test]
fn single_probe_failure_does_not_flap() {
    let mut state = NetworkState::new(true, epoch());
    let changes = apply_all(
        &mut state,
        &[
            Signal::ProbeFailed,
            Signal::ProbeSucceeded(Duration::from_millis(50)),
            Signal::ProbeFailed,
        ],
    );
    assert_eq!(changes, vec![false, false, false]);
    assert!(state.status().is_online);
}

#[test]
fn consecutive_probe_failures_declare_offline() {
    let mut state = NetworkState::new(true, epoch());
    let changes = apply_all(&mut state, &[Signal::ProbeFailed, Signal::ProbeFailed]);
    assert_eq!(changes, vec![false, true]);
    assert!(!state.status().is_online);
    assert!(state.host_online());

    // A later success while the host still says online restores it.
    let changes = apply_all(&mut state, &[Signal::ProbeSucceeded(Duration::from_millis(10))]);
    assert_eq!(changes, vec![true]);
    assert!(state.status().is_online);
}

#[test]
fn probes_cannot_override_offline_host() {
    let mut state = NetworkState::new(false, epoch());
    let changes = apply_all(
        &mut state,
        &[Signal::ProbeSucceeded(Duration::from_millis(10)), Signal::ProbeFailed],
    );
    assert_eq!(changes, vec![false, false]);
    assert!(!state.status().is_online);
}

#[parameterized(
    fast = { 100, false },
    at_threshold = { 2_000, false },
    slow = { 2_500, true },
)]
fn slow_connection_from_round_trip(rtt_ms: u64, slow: bool) {
    let mut state = NetworkState::new(true, epoch());
    state.apply(Signal::ProbeSucceeded(Duration::from_millis(rtt_ms)), epoch(), 2, SLOW);
    assert_eq!(state.status().is_slow_connection, slow);
    assert!(state.status().is_online);
}

#[test]
fn repeated_host_signal_is_not_a_change() {
    let mut state = NetworkState::new(true, epoch());
    assert_eq!(apply_all(&mut state, &[Signal::Host(true)]), vec![false]);
}

struct Fixture {
    monitor: NetworkMonitor,
    connectivity: Connectivity,
    probe: Arc<MockProbe>,
    bus: Arc<EventBus>,
}

fn fixture(online: bool) -> Fixture {
    let connectivity = Connectivity::new(online);
    let probe = Arc::new(MockProbe::new());
    let bus = Arc::new(EventBus::new(16));
    let (_, clock) = manual_clock();
    let monitor = NetworkMonitor::new(
        connectivity.clone(),
        probe.clone(),
        Arc::clone(&bus),
        clock,
        shared_config(OfflineConfig::default()),
    );
    Fixture {
        monitor,
        connectivity,
        probe,
        bus,
    }
}

#[tokio::test(start_paused = true)]
async fn probe_now_debounces_failures() {
    let f = fixture(true);
    let mut events = f.bus.subscribe();
    f.probe
        .push(Duration::ZERO, Err(ProbeError::Unreachable("down".into())));
    f.probe
        .push(Duration::ZERO, Err(ProbeError::Unreachable("down".into())));

    assert!(f.monitor.probe_now().await.is_online);
    assert!(!f.monitor.probe_now().await.is_online);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind(), EventKind::NetworkStatusChanged);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn slow_probe_marks_connection_slow() {
    let f = fixture(true);
    f.probe.push(Duration::from_secs(3), Ok(()));

    let status = f.monitor.probe_now().await;
    assert!(status.is_online);
    assert!(status.is_slow_connection);
}

#[tokio::test(start_paused = true)]
async fn hung_probe_counts_as_failure() {
    let f = fixture(true);
    f.probe.push(Duration::from_secs(60), Ok(()));
    f.probe.push(Duration::from_secs(60), Ok(()));

    f.monitor.probe_now().await;
    let status = f.monitor.probe_now().await;
    assert!(!status.is_online);
}

#[tokio::test(start_paused = true)]
async fn running_monitor_follows_host_signal() {
    let f = fixture(true);
    let mut watch = f.monitor.watch();

    f.monitor.start();
    f.monitor.start();
    assert!(f.monitor.is_running());

    f.connectivity.set_online(false);
    watch.changed().await.unwrap();
    assert!(!watch.borrow_and_update().is_online);
    assert!(!f.monitor.is_online());

    f.connectivity.set_online(true);
    watch.changed().await.unwrap();
    assert!(watch.borrow_and_update().is_online);

    f.monitor.stop().await;
    assert!(!f.monitor.is_running());
}

#[tokio::test(start_paused = true)]
async fn running_monitor_probes_on_interval() {
    let f = fixture(true);
    f.monitor.start();

    tokio::time::sleep(Duration::from_millis(25_500)).await;
    // One probe at start, then one every 10s.
    assert_eq!(f.probe.count(), 3);

    f.monitor.stop().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(f.probe.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn stopped_monitor_ignores_host_changes() {
    let f = fixture(true);
    f.monitor.start();
    f.monitor.stop().await;

    f.connectivity.set_online(false);
    tokio::task::yield_now().await;
    assert!(f.monitor.is_online());
}
