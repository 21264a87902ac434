// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of pending mutations.
//!
//! Requests live in the store's queue collection; the queue itself keeps
//! no state beyond the clock that stamps them, so a restarted process
//! recovers everything by reopening the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ofs_core::id::generate_unique_id;
use ofs_core::{
    Collection, Document, Error, FailedRequest, Filter, MonotonicClock, NewRequest,
    OfflineRequest, OverflowPolicy, Priority, Result, SharedClock, Store, SyncStatus,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::events::{Event, EventBus};
use crate::shared::{config_of, lock, SharedConfig, SharedStore};

/// What `mark_failed` did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still queued; eligible again at `next_attempt_at`.
    Retry {
        retry_count: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Out of retries; moved to the dead-letter list.
    Exhausted,
    /// No longer queued, e.g. cleared while its replay was in flight.
    Gone,
}

pub struct RequestQueue<S> {
    store: SharedStore<S>,
    bus: Arc<EventBus>,
    clock: MonotonicClock<SharedClock>,
    config: SharedConfig,
}

impl<S: Store> RequestQueue<S> {
    /// Wrap `store`, continuing the timestamp sequence of anything already
    /// queued there.
    pub fn new(
        store: SharedStore<S>,
        bus: Arc<EventBus>,
        clock: SharedClock,
        config: SharedConfig,
    ) -> Result<Self> {
        let clock = MonotonicClock::new(clock);
        let recovered = lock(&store).list(Collection::Queue, &Filter::all())?;
        if let Some(latest) = recovered.iter().map(|doc| doc.timestamp).max() {
            clock.observe(latest);
        }
        if !recovered.is_empty() {
            info!(pending = recovered.len(), "recovered queued requests");
        }
        Ok(RequestQueue {
            store,
            bus,
            clock,
            config,
        })
    }

    pub fn store(&self) -> &SharedStore<S> {
        &self.store
    }

    /// Persist a new request and announce it.
    pub fn enqueue(&self, request: NewRequest) -> Result<OfflineRequest> {
        let policy = config_of(&self.config).overflow_policy;
        let timestamp = self.clock.now();
        let request = {
            let mut store = lock(&self.store);
            let id = generate_unique_id(
                &request.call.table,
                request.call.operation,
                &timestamp,
                |candidate| matches!(store.get(Collection::Queue, candidate), Ok(Some(_))),
            );
            let request = OfflineRequest {
                id,
                table: request.call.table,
                operation: request.call.operation,
                payload: request.call.payload,
                priority: request.priority,
                timestamp,
                retry_count: 0,
                next_attempt_at: None,
                last_error: None,
            };
            let doc = to_document(&request)?;
            match store.insert(Collection::Queue, doc.clone()) {
                Ok(_) => {}
                Err(Error::CapacityExceeded { .. }) if policy == OverflowPolicy::DropOldestLow => {
                    let victim = oldest_low(&*store)?;
                    let Some(victim) = victim else {
                        let limit = store.limits().max_queue_size;
                        return Err(Error::CapacityExceeded {
                            collection: Collection::Queue.as_str(),
                            limit,
                        });
                    };
                    warn!(dropped = %victim.id, "queue full, dropping oldest low-priority request");
                    store.remove(Collection::Queue, &victim.id)?;
                    store.insert(Collection::Queue, doc)?;
                }
                Err(e) => return Err(e),
            }
            request
        };
        debug!(id = %request.id, table = %request.table, priority = %request.priority, "request queued");
        self.bus.emit(Event::RequestQueued(request.clone()));
        Ok(request)
    }

    /// Snapshot of every pending request in replay order.
    pub fn dequeue_all_ordered(&self) -> Result<Vec<OfflineRequest>> {
        let mut requests = self.pending()?;
        requests.sort_by(OfflineRequest::replay_order);
        Ok(requests)
    }

    /// Pending requests in storage order, optionally for one table.
    pub fn list(&self, filter: &Filter) -> Result<Vec<OfflineRequest>> {
        lock(&self.store)
            .list(Collection::Queue, filter)?
            .iter()
            .map(Document::decode)
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<Option<OfflineRequest>> {
        lock(&self.store)
            .get(Collection::Queue, id)?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Drop a replayed request.
    pub fn mark_succeeded(&self, id: &str) -> Result<()> {
        if !lock(&self.store).remove(Collection::Queue, id)? {
            debug!(id, "succeeded request was already gone");
        }
        Ok(())
    }

    /// Record a retryable failure and schedule the next attempt.
    ///
    /// Once `retry_count` exceeds `max_retries` the request moves to the
    /// dead-letter list instead of staying queued.
    pub fn mark_failed(&self, id: &str, error: &str) -> Result<FailureOutcome> {
        let config = config_of(&self.config);
        let now = self.clock.wall();
        let mut store = lock(&self.store);
        let Some(doc) = store.get(Collection::Queue, id)? else {
            debug!(id, "failed request was already gone");
            return Ok(FailureOutcome::Gone);
        };
        let mut request: OfflineRequest = doc.decode()?;

        request.retry_count = request.retry_count.saturating_add(1);
        request.last_error = Some(error.to_string());

        if request.retry_count > config.max_retries {
            warn!(id, retries = config.max_retries, error, "request exhausted its retries");
            dead_letter(&mut *store, request, error, now, false)?;
            return Ok(FailureOutcome::Exhausted);
        }

        let delay = chrono::Duration::from_std(config.backoff_delay(request.retry_count))
            .unwrap_or(chrono::TimeDelta::MAX);
        let next_attempt_at = now.checked_add_signed(delay).unwrap_or(now);
        store.update(
            Collection::Queue,
            id,
            &json!({
                "retry_count": request.retry_count,
                "next_attempt_at": next_attempt_at,
                "last_error": error,
            }),
        )?;
        debug!(id, retry_count = request.retry_count, %next_attempt_at, "request will be retried");
        Ok(FailureOutcome::Retry {
            retry_count: request.retry_count,
            next_attempt_at,
        })
    }

    /// Record a terminal failure: the request is dead-lettered untouched.
    ///
    /// Returns false when the request was no longer queued.
    pub fn mark_rejected(&self, id: &str, error: &str) -> Result<bool> {
        let now = self.clock.wall();
        let mut store = lock(&self.store);
        let Some(doc) = store.get(Collection::Queue, id)? else {
            debug!(id, "rejected request was already gone");
            return Ok(false);
        };
        let request: OfflineRequest = doc.decode()?;
        warn!(id, error, "request rejected");
        dead_letter(&mut *store, request, error, now, true)?;
        Ok(true)
    }

    pub fn pending_count(&self) -> Result<usize> {
        lock(&self.store).count(Collection::Queue)
    }

    /// Dead letters, oldest first.
    pub fn dead_letters(&self) -> Result<Vec<FailedRequest>> {
        lock(&self.store)
            .list(Collection::DeadLetter, &Filter::all())?
            .iter()
            .map(Document::decode)
            .collect()
    }

    pub fn failed_count(&self) -> Result<usize> {
        lock(&self.store).count(Collection::DeadLetter)
    }

    /// Move every dead letter back into the queue with fresh counters.
    ///
    /// Stops at the first request that does not fit; the rest stay
    /// dead-lettered. Returns how many were requeued.
    pub fn retry_dead_letters(&self) -> Result<usize> {
        let mut store = lock(&self.store);
        let failed: Vec<FailedRequest> = store
            .list(Collection::DeadLetter, &Filter::all())?
            .iter()
            .map(Document::decode)
            .collect::<Result<_>>()?;
        let mut requeued = 0;
        for entry in failed {
            let mut request = entry.request;
            request.retry_count = 0;
            request.next_attempt_at = None;
            request.last_error = None;
            let id = request.id.clone();
            match store.insert(Collection::Queue, to_document(&request)?) {
                Ok(_) => {}
                Err(Error::CapacityExceeded { limit, .. }) => {
                    warn!(limit, "queue full, leaving remaining dead letters in place");
                    break;
                }
                Err(e) => return Err(e),
            }
            store.remove(Collection::DeadLetter, &id)?;
            requeued += 1;
        }
        if requeued > 0 {
            info!(requeued, "dead letters requeued");
        }
        Ok(requeued)
    }

    /// Drop every pending request. Returns how many were dropped.
    pub fn clear(&self) -> Result<usize> {
        let cleared = lock(&self.store).clear(Collection::Queue, &Filter::all())?;
        info!(cleared, "queue cleared");
        Ok(cleared)
    }

    pub fn clear_dead_letters(&self) -> Result<usize> {
        lock(&self.store).clear(Collection::DeadLetter, &Filter::all())
    }

    /// Queue health as seen right now.
    pub fn sync_status(&self, is_syncing: bool) -> Result<SyncStatus> {
        let store = lock(&self.store);
        let pending_requests = store.count(Collection::Queue)?;
        let dead = store.list(Collection::DeadLetter, &Filter::all())?;
        let sync_errors = dead
            .iter()
            .map(|doc| doc.decode::<FailedRequest>().map(|f| describe(&f)))
            .collect::<Result<Vec<_>>>()?;
        Ok(SyncStatus {
            is_syncing,
            pending_requests,
            failed_requests: dead.len(),
            sync_errors,
        })
    }

    fn pending(&self) -> Result<Vec<OfflineRequest>> {
        self.list(&Filter::all())
    }
}

/// One-line description of a dead letter, as shown in `sync_errors`.
pub fn describe(failed: &FailedRequest) -> String {
    format!(
        "{} {} {}: {}",
        failed.request.operation, failed.request.table, failed.request.id, failed.error
    )
}

fn to_document(request: &OfflineRequest) -> Result<Document> {
    Document::from_record(
        request.id.clone(),
        request.table.clone(),
        request.timestamp,
        request,
    )
}

fn oldest_low<S: Store + ?Sized>(store: &S) -> Result<Option<OfflineRequest>> {
    let pending: Vec<OfflineRequest> = store
        .list(Collection::Queue, &Filter::all())?
        .iter()
        .map(Document::decode)
        .collect::<Result<_>>()?;
    Ok(pending
        .into_iter()
        .filter(|r| r.priority == Priority::Low)
        .min_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))))
}

/// Moves a request to the dead-letter list. The dead letter is written
/// before the queue entry is removed.
fn dead_letter<S: Store + ?Sized>(
    store: &mut S,
    request: OfflineRequest,
    error: &str,
    now: DateTime<Utc>,
    terminal: bool,
) -> Result<()> {
    let id = request.id.clone();
    let table = request.table.clone();
    let failed = FailedRequest {
        request,
        error: error.to_string(),
        failed_at: now,
        terminal,
    };
    store.insert(
        Collection::DeadLetter,
        Document::from_record(id.clone(), table, now, &failed)?,
    )?;
    store.remove(Collection::Queue, &id)?;
    Ok(())
}

impl<S> std::fmt::Debug for RequestQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
