// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue replay.
//!
//! A [`SyncEngine`] drains the request queue through the transport. At most
//! one drain runs at a time: a trigger that arrives mid-drain joins the
//! running one and receives the same [`SyncReport`].
//!
//! Each drain works on a snapshot taken when it starts and replays it
//! strictly in order, one request at a time. Failures never sleep inside a
//! pass; a retryable failure schedules the request for a later pass and
//! holds back the rest of its table so dependent writes stay ordered.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures_util::future::{FutureExt, Shared};
use ofs_core::{
    Error, NetworkStatus, OfflineRequest, Result, SharedClock, Store, SyncReport, SyncStatus,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventBus};
use crate::queue::{FailureOutcome, RequestQueue};
use crate::shared::{config_of, lock, SharedConfig};
use crate::transport::{BoxFuture, Classifier, ErrorClass, Transport};

type DrainResult = std::result::Result<SyncReport, Arc<Error>>;
type SharedDrain = Shared<BoxFuture<'static, DrainResult>>;

/// Whether a drain is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

struct Lifecycle {
    token: CancellationToken,
    triggers: Option<JoinHandle<()>>,
}

struct EngineInner<S, T> {
    queue: Arc<RequestQueue<S>>,
    transport: Arc<T>,
    classifier: Arc<dyn Classifier>,
    bus: Arc<EventBus>,
    clock: SharedClock,
    config: SharedConfig,
    network: watch::Receiver<NetworkStatus>,
    state: Mutex<SyncState>,
    in_flight: Mutex<Option<SharedDrain>>,
    lifecycle: Mutex<Lifecycle>,
}

/// The sync coordinator. Cheap to clone; clones share one engine.
pub struct SyncEngine<S, T> {
    inner: Arc<EngineInner<S, T>>,
}

impl<S, T> Clone for SyncEngine<S, T> {
    fn clone(&self) -> Self {
        SyncEngine {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, T> SyncEngine<S, T> {
    /// Signal the triggers and any running drain to stop, without waiting.
    pub fn cancel(&self) {
        let mut lifecycle = lock(&self.inner.lifecycle);
        lifecycle.token.cancel();
        lifecycle.triggers = None;
    }
}

impl<S, T> SyncEngine<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    pub fn new(
        queue: Arc<RequestQueue<S>>,
        transport: Arc<T>,
        classifier: Arc<dyn Classifier>,
        bus: Arc<EventBus>,
        clock: SharedClock,
        config: SharedConfig,
        network: watch::Receiver<NetworkStatus>,
    ) -> Self {
        SyncEngine {
            inner: Arc::new(EngineInner {
                queue,
                transport,
                classifier,
                bus,
                clock,
                config,
                network,
                state: Mutex::new(SyncState::Idle),
                in_flight: Mutex::new(None),
                lifecycle: Mutex::new(Lifecycle {
                    token: CancellationToken::new(),
                    triggers: None,
                }),
            }),
        }
    }

    pub fn queue(&self) -> &Arc<RequestQueue<S>> {
        &self.inner.queue
    }

    pub fn state(&self) -> SyncState {
        *lock(&self.inner.state)
    }

    pub fn is_syncing(&self) -> bool {
        self.state() == SyncState::Syncing
    }

    /// Queue health, recomputed from the store.
    pub fn status(&self) -> Result<SyncStatus> {
        self.inner.queue.sync_status(self.is_syncing())
    }

    /// Drain the queue now, or join the drain already in progress.
    ///
    /// The drain runs on its own task, so dropping the returned future does
    /// not interrupt it.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let drain = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(drain) => {
                    debug!("sync already running, joining it");
                    drain.clone()
                }
                None => {
                    let drain = self.spawn_drain();
                    *slot = Some(drain.clone());
                    drain
                }
            }
        };
        drain
            .await
            .map_err(|e| Arc::try_unwrap(e).unwrap_or_else(|e| Error::SyncFailed(e.to_string())))
    }

    /// Start the background triggers: a drain on every offline-to-online
    /// transition, and every `sync_interval` while background sync is
    /// enabled, online, and the queue is non-empty. Idempotent.
    pub fn start(&self) {
        let mut lifecycle = lock(&self.inner.lifecycle);
        if lifecycle.triggers.is_some() {
            return;
        }
        if lifecycle.token.is_cancelled() {
            lifecycle.token = CancellationToken::new();
        }
        let token = lifecycle.token.clone();
        lifecycle.triggers = Some(tokio::spawn(run_triggers(self.clone(), token)));
        debug!("sync triggers started");
    }

    /// Stop the triggers and wait for any running drain to finish its
    /// current request. Remaining requests stay queued.
    pub async fn stop(&self) {
        let triggers = {
            let mut lifecycle = lock(&self.inner.lifecycle);
            lifecycle.token.cancel();
            lifecycle.triggers.take()
        };
        if let Some(handle) = triggers {
            let _ = handle.await;
        }
        let running = lock(&self.inner.in_flight).clone();
        if let Some(drain) = running {
            let _ = drain.await;
        }
        debug!("sync engine stopped");
    }

    fn spawn_drain(&self) -> SharedDrain {
        let inner = Arc::clone(&self.inner);
        let token = lock(&self.inner.lifecycle).token.clone();
        let handle = tokio::spawn(async move {
            let result = inner.drain(&token).await;
            *lock(&inner.state) = SyncState::Idle;
            *lock(&inner.in_flight) = None;
            result
        });
        let joined: BoxFuture<'static, DrainResult> = Box::pin(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(Error::SyncFailed(format!("sync task failed: {e}")))),
            }
        });
        joined.shared()
    }
}

impl<S, T> EngineInner<S, T>
where
    S: Store,
    T: Transport,
{
    async fn drain(&self, stop: &CancellationToken) -> DrainResult {
        if !self.network.borrow().is_online {
            let pending = self.queue.pending_count().map_err(Arc::new)?;
            debug!(pending, "offline, skipping sync");
            return Ok(SyncReport {
                deferred: pending,
                ..Default::default()
            });
        }

        *lock(&self.state) = SyncState::Syncing;
        let snapshot = match self.queue.dequeue_all_ordered() {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail(e, SyncReport::default())),
        };
        info!(pending = snapshot.len(), "sync started");
        self.bus.emit(Event::SyncStarted {
            pending: snapshot.len(),
        });

        let mut report = SyncReport::default();
        let abort_reason = match self.replay(&snapshot, &mut report, stop).await {
            Ok(reason) => reason,
            Err(e) => return Err(self.fail(e, report)),
        };

        if report.is_clean() {
            info!(
                success = report.success,
                failed = report.failed,
                deferred = report.deferred,
                "sync completed"
            );
            self.bus.emit(Event::SyncCompleted(report.clone()));
        } else {
            let error = abort_reason.unwrap_or_else(|| report.errors.join("; "));
            warn!(
                success = report.success,
                failed = report.failed,
                error = %error,
                "sync finished with errors"
            );
            self.bus.emit(Event::SyncFailed {
                error,
                report: report.clone(),
            });
        }
        Ok(report)
    }

    /// Replays `snapshot` in order. Returns why the pass stopped early, if
    /// it did.
    async fn replay(
        &self,
        snapshot: &[OfflineRequest],
        report: &mut SyncReport,
        stop: &CancellationToken,
    ) -> Result<Option<String>> {
        let config = config_of(&self.config);
        let now = self.clock.now();
        let mut held_tables: HashSet<&str> = HashSet::new();
        let mut consecutive_failures = 0u32;

        for (index, request) in snapshot.iter().enumerate() {
            let remaining = snapshot.len() - index;
            if stop.is_cancelled() {
                report.aborted = true;
                report.deferred += remaining;
                return Ok(Some("sync stopped".to_string()));
            }
            if !self.network.borrow().is_online {
                report.aborted = true;
                report.deferred += remaining;
                return Ok(Some("network went offline".to_string()));
            }
            if held_tables.contains(request.table.as_str()) || !request.is_due(now) {
                held_tables.insert(request.table.as_str());
                report.deferred += 1;
                continue;
            }

            if self.queue.get(&request.id)?.is_none() {
                debug!(id = %request.id, "request left the queue before its replay");
                continue;
            }

            debug!(id = %request.id, table = %request.table, op = %request.operation, "replaying request");
            let error = match self.transport.execute(&request.call()).await {
                Ok(_) => {
                    self.queue.mark_succeeded(&request.id)?;
                    report.success += 1;
                    consecutive_failures = 0;
                    continue;
                }
                Err(error) => error,
            };

            match self.classifier.classify(&error) {
                ErrorClass::Terminal => {
                    consecutive_failures = 0;
                    if !self.queue.mark_rejected(&request.id, &error.to_string())? {
                        continue;
                    }
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("{} {}: {}", request.operation, request.id, error));
                }
                ErrorClass::Retryable => {
                    let outcome = self.queue.mark_failed(&request.id, &error.to_string())?;
                    if outcome == FailureOutcome::Gone {
                        continue;
                    }
                    report.failed += 1;
                    consecutive_failures += 1;
                    held_tables.insert(request.table.as_str());
                    if outcome == FailureOutcome::Exhausted {
                        report.errors.push(format!(
                            "{} {}: gave up after {} retries: {}",
                            request.operation, request.id, config.max_retries, error
                        ));
                    }
                    if consecutive_failures >= config.abort_after_failures {
                        report.aborted = true;
                        report.deferred += remaining - 1;
                        return Ok(Some(format!(
                            "aborted after {consecutive_failures} consecutive failures: {error}"
                        )));
                    }
                }
            }
        }
        Ok(None)
    }

    fn fail(&self, e: Error, report: SyncReport) -> Arc<Error> {
        error!(error = %e, "sync failed");
        self.bus.emit(Event::SyncFailed {
            error: e.to_string(),
            report,
        });
        Arc::new(e)
    }
}

async fn run_triggers<S, T>(engine: SyncEngine<S, T>, stop: CancellationToken)
where
    S: Store + 'static,
    T: Transport + 'static,
{
    let mut network = engine.inner.network.clone();
    let mut was_online = network.borrow_and_update().is_online;
    if was_online && has_pending(&engine) {
        tokio::select! {
            _ = stop.cancelled() => return,
            result = engine.sync_now() => log_trigger_result("startup", result),
        }
    }

    let mut next_tick = Instant::now() + config_of(&engine.inner.config).sync_interval();
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            changed = network.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = network.borrow_and_update().is_online;
                let came_back = online && !was_online;
                was_online = online;
                if came_back && has_pending(&engine) {
                    info!("back online, syncing");
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        result = engine.sync_now() => log_trigger_result("reconnect", result),
                    }
                }
            }
            _ = tokio::time::sleep_until(next_tick) => {
                let config = config_of(&engine.inner.config);
                next_tick = Instant::now() + config.sync_interval();
                if config.enable_background_sync && was_online && has_pending(&engine) {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        result = engine.sync_now() => log_trigger_result("interval", result),
                    }
                }
            }
        }
    }
}

fn has_pending<S: Store, T>(engine: &SyncEngine<S, T>) -> bool {
    match engine.inner.queue.pending_count() {
        Ok(count) => count > 0,
        Err(e) => {
            warn!(error = %e, "failed to read queue size");
            false
        }
    }
}

fn log_trigger_result(trigger: &str, result: Result<SyncReport>) {
    match result {
        Ok(report) => debug!(trigger, success = report.success, failed = report.failed, "triggered sync finished"),
        Err(e) => warn!(trigger, error = %e, "triggered sync failed"),
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
