// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::AtomicUsize;

fn started(pending: usize) -> Event {
    Event::SyncStarted { pending }
}

#[test]
fn callbacks_filter_by_kind() {
    let bus = EventBus::new(8);
    let started_seen = Arc::new(AtomicUsize::new(0));
    let any_seen = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&started_seen);
    bus.on(EventKind::SyncStarted, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&any_seen);
    bus.on_any(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.emit(started(1));
    bus.emit(Event::SyncCompleted(SyncReport::default()));

    assert_eq!(started_seen.load(Ordering::SeqCst), 1);
    assert_eq!(any_seen.load(Ordering::SeqCst), 2);
}

#[test]
fn off_unregisters() {
    let bus = EventBus::new(8);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let id = bus.on_any(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.emit(started(0));
    assert!(bus.off(id));
    assert!(!bus.off(id));
    bus.emit(started(0));

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn handler_may_unregister_itself() {
    let bus = Arc::new(EventBus::new(8));
    let seen = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

    let (bus_ref, counter, slot_ref) = (Arc::clone(&bus), Arc::clone(&seen), Arc::clone(&slot));
    let id = bus.on_any(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = *slot_ref.lock().unwrap() {
            bus_ref.off(id);
        }
    });
    *slot.lock().unwrap() = Some(id);

    bus.emit(started(0));
    bus.emit(started(0));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn subscribers_receive_snapshots() {
    let bus = EventBus::new(8);
    let mut rx = bus.subscribe();

    let report = SyncReport {
        success: 3,
        ..Default::default()
    };
    bus.emit(Event::SyncCompleted(report.clone()));

    let event = rx.recv().await.unwrap();
    assert_eq!(event, Event::SyncCompleted(report));
    assert_eq!(event.kind(), EventKind::SyncCompleted);
}

#[tokio::test]
async fn muted_bus_delivers_nothing() {
    let bus = EventBus::new(8);
    let mut rx = bus.subscribe();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    bus.on_any(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.set_muted(true);
    bus.emit(started(1));
    bus.set_muted(false);
    bus.emit(started(2));

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(rx.recv().await.unwrap(), started(2));
}

#[test]
fn emit_without_subscribers_is_fine() {
    let bus = EventBus::new(1);
    bus.emit(started(0));
}

#[test]
fn events_serialize_with_tag() {
    let json = serde_json::to_value(started(4)).unwrap();
    assert_eq!(json["event"], "sync_started");
    assert_eq!(json["pending"], 4);
}
