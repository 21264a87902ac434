// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed publish/subscribe for engine state changes.
//!
//! Subscribers either hold a broadcast [`Receiver`](broadcast::Receiver) and
//! pattern-match on [`Event`], or register a callback with [`EventBus::on`].
//! Both receive owned snapshots; nothing handed out aliases engine state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ofs_core::{NetworkStatus, OfflineConfig, OfflineRequest, SyncReport};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Something that changed inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    NetworkStatusChanged(NetworkStatus),
    SyncStarted { pending: usize },
    SyncCompleted(SyncReport),
    SyncFailed { error: String, report: SyncReport },
    RequestQueued(OfflineRequest),
    ConfigUpdated(OfflineConfig),
}

/// Discriminant of [`Event`], used to filter callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NetworkStatusChanged,
    SyncStarted,
    SyncCompleted,
    SyncFailed,
    RequestQueued,
    ConfigUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NetworkStatusChanged => "network-status-changed",
            EventKind::SyncStarted => "sync-started",
            EventKind::SyncCompleted => "sync-completed",
            EventKind::SyncFailed => "sync-failed",
            EventKind::RequestQueued => "request-queued",
            EventKind::ConfigUpdated => "config-updated",
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::NetworkStatusChanged(_) => EventKind::NetworkStatusChanged,
            Event::SyncStarted { .. } => EventKind::SyncStarted,
            Event::SyncCompleted(_) => EventKind::SyncCompleted,
            Event::SyncFailed { .. } => EventKind::SyncFailed,
            Event::RequestQueued(_) => EventKind::RequestQueued,
            Event::ConfigUpdated(_) => EventKind::ConfigUpdated,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Listener {
    id: ListenerId,
    kind: Option<EventKind>,
    handler: Handler,
}

/// Fan-out of engine events to channel subscribers and callbacks.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
    muted: AtomicBool,
}

impl EventBus {
    /// Create a bus whose channel buffers `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus {
            tx,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            muted: AtomicBool::new(false),
        }
    }

    /// Publish an event. Dropped silently while muted or unobserved.
    pub fn emit(&self, event: Event) {
        if self.muted.load(Ordering::Acquire) {
            trace!(kind = event.kind().as_str(), "event muted");
            return;
        }
        let kind = event.kind();
        // Handlers run outside the lock so they may call `on`/`off`.
        let handlers: Vec<Handler> = self
            .lock_listeners()
            .iter()
            .filter(|l| l.kind.is_none() || l.kind == Some(kind))
            .map(|l| Arc::clone(&l.handler))
            .collect();
        for handler in handlers {
            handler(&event);
        }
        let _ = self.tx.send(event);
    }

    /// A new receiver that sees every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Register `handler` for one kind of event.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Register `handler` for every event.
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Unregister a callback. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    fn register(&self, kind: Option<EventKind>, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push(Listener { id, kind, handler });
        id
    }

    /// Poisoning is ignored; the list is never left half-updated.
    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
