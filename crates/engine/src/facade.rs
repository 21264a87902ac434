// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The application-facing entry point.
//!
//! An [`OfflineFacade`] owns one session's worth of engine components. It is
//! built explicitly, started with [`init`](OfflineFacade::init) and shut
//! down with [`dispose`](OfflineFacade::dispose); there is no global
//! instance.
//!
//! Mutations go through [`perform`](OfflineFacade::perform): online they hit
//! the transport directly, otherwise they are queued for the sync engine.
//! Reads go through [`read`](OfflineFacade::read), which refreshes the local
//! cache while online and serves it while offline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ofs_core::store::merge_patch;
use ofs_core::{
    cache_key, Collection, Document, EngineStatus, Error, FailedRequest, Filter, NetworkStatus,
    NewRequest, OfflineConfig, OfflineData, OfflineRequest, Operation, Priority, RemoteCall,
    Result, SharedClock, Store, SyncReport, SystemClock,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::engine::SyncEngine;
use crate::events::{Event, EventBus, EventKind, ListenerId};
use crate::network::{Connectivity, NetworkMonitor};
use crate::probe::{NoProbe, Probe};
use crate::queue::RequestQueue;
use crate::shared::{config_of, lock, replace_config, shared_config, shared_store, SharedConfig, SharedStore};
use crate::transport::{
    to_engine_error, Classifier, DefaultClassifier, ErrorClass, RemoteRecord, Transport,
};

/// Result of [`OfflineFacade::perform`].
#[derive(Debug, Clone, PartialEq)]
pub enum PerformOutcome {
    /// The server accepted the call and returned this result.
    Completed(Value),
    /// The call was queued for a later sync. `optimistic` carries the
    /// locally applied record when optimistic updates are enabled.
    Queued {
        request: OfflineRequest,
        optimistic: Option<Value>,
    },
}

impl PerformOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, PerformOutcome::Queued { .. })
    }

    /// The value the caller should display: the server result, or the
    /// optimistic record if there is one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            PerformOutcome::Completed(value) => Some(value),
            PerformOutcome::Queued { optimistic, .. } => optimistic.as_ref(),
        }
    }
}

/// Assembles an [`OfflineFacade`].
///
/// Only the store and the transport are required. Connectivity defaults to
/// online, the probe to [`NoProbe`], the classifier to
/// [`DefaultClassifier`] and the clock to [`SystemClock`].
pub struct FacadeBuilder<S, T> {
    store: S,
    transport: T,
    config: OfflineConfig,
    connectivity: Option<Connectivity>,
    probe: Option<Arc<dyn Probe>>,
    classifier: Option<Arc<dyn Classifier>>,
    clock: Option<SharedClock>,
}

impl<S, T> FacadeBuilder<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    pub fn config(mut self, config: OfflineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the config and wire the components together. Recovers any
    /// requests already queued in the store.
    pub fn build(self) -> Result<OfflineFacade<S, T>> {
        self.config.validate()?;
        let mut store = self.store;
        store.set_limits(self.config.limits());

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let bus = Arc::new(EventBus::new(self.config.event_capacity));
        bus.set_muted(!self.config.enable_notifications);
        let config = shared_config(self.config);
        let store = shared_store(store);
        let transport = Arc::new(self.transport);
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(DefaultClassifier));

        let monitor = NetworkMonitor::new(
            self.connectivity.unwrap_or_else(|| Connectivity::new(true)),
            self.probe.unwrap_or_else(|| Arc::new(NoProbe)),
            Arc::clone(&bus),
            clock.clone(),
            Arc::clone(&config),
        );
        let queue = Arc::new(RequestQueue::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            clock.clone(),
            Arc::clone(&config),
        )?);
        let engine = SyncEngine::new(
            Arc::clone(&queue),
            Arc::clone(&transport),
            Arc::clone(&classifier),
            Arc::clone(&bus),
            clock.clone(),
            Arc::clone(&config),
            monitor.watch(),
        );

        Ok(OfflineFacade {
            store,
            transport,
            classifier,
            bus,
            clock,
            config,
            monitor,
            queue,
            engine,
            initialized: AtomicBool::new(false),
        })
    }
}

/// One offline-aware session against a remote backend.
pub struct OfflineFacade<S, T> {
    store: SharedStore<S>,
    transport: Arc<T>,
    classifier: Arc<dyn Classifier>,
    bus: Arc<EventBus>,
    clock: SharedClock,
    config: SharedConfig,
    monitor: NetworkMonitor,
    queue: Arc<RequestQueue<S>>,
    engine: SyncEngine<S, T>,
    initialized: AtomicBool,
}

impl<S, T> OfflineFacade<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    pub fn builder(store: S, transport: T) -> FacadeBuilder<S, T> {
        FacadeBuilder {
            store,
            transport,
            config: OfflineConfig::default(),
            connectivity: None,
            probe: None,
            classifier: None,
            clock: None,
        }
    }

    /// Start the network monitor and the sync triggers. Idempotent. Must be
    /// called inside a tokio runtime.
    pub fn init(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        self.monitor.start();
        self.engine.start();
        info!("offline engine initialized");
    }

    /// Stop background work. A drain in progress finishes its current
    /// request; everything else stays queued for the next session.
    pub async fn dispose(&self) {
        if !self.initialized.swap(false, Ordering::SeqCst) {
            return;
        }
        self.engine.stop().await;
        self.monitor.stop().await;
        info!("offline engine disposed");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Perform a mutation at medium priority.
    pub async fn perform(
        &self,
        operation: Operation,
        table: &str,
        payload: Value,
    ) -> Result<PerformOutcome> {
        self.perform_with_priority(operation, table, payload, Priority::Medium)
            .await
    }

    /// Perform a mutation, queueing it at `priority` if it cannot complete
    /// now.
    ///
    /// Terminal failures are returned and never queued. A retryable failure
    /// is queued only when optimistic updates are enabled.
    pub async fn perform_with_priority(
        &self,
        operation: Operation,
        table: &str,
        payload: Value,
        priority: Priority,
    ) -> Result<PerformOutcome> {
        self.ensure_initialized()?;
        let call = RemoteCall::new(operation, table, payload);
        let config = config_of(&self.config);

        if !self.monitor.is_online() {
            debug!(table, op = %operation, "offline, queueing");
            return self.queue_call(call, priority, &config);
        }

        match self.transport.execute(&call).await {
            Ok(result) => {
                if config.enable_optimistic_updates {
                    self.apply_result(&call, &result)?;
                }
                Ok(PerformOutcome::Completed(result))
            }
            Err(error) => {
                let class = self.classifier.classify(&error);
                if class == ErrorClass::Retryable && config.enable_optimistic_updates {
                    warn!(table, op = %operation, error = %error, "call failed, queueing");
                    return self.queue_call(call, priority, &config);
                }
                Err(to_engine_error(error, class))
            }
        }
    }

    /// Queue a request for the sync engine without attempting it.
    pub fn queue_request(&self, request: NewRequest) -> Result<OfflineRequest> {
        self.ensure_initialized()?;
        self.queue.enqueue(request)
    }

    /// Read one record (`id` given) or a whole table.
    ///
    /// Online, the result comes from the server and replaces the cached
    /// copy. Offline, or when the server cannot be reached, the cached copy
    /// is returned and may be stale.
    pub async fn read(&self, table: &str, id: Option<&str>) -> Result<Vec<OfflineData>> {
        self.ensure_initialized()?;
        if self.monitor.is_online() {
            match self.transport.fetch(table, id).await {
                Ok(records) => return self.refresh_cache(table, id, records),
                Err(error) => {
                    let class = self.classifier.classify(&error);
                    if class == ErrorClass::Terminal {
                        return Err(to_engine_error(error, class));
                    }
                    warn!(table, error = %error, "fetch failed, serving cache");
                }
            }
        }
        self.cached(table, id)
    }

    /// Replay the queue now, or join the replay already running.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        self.ensure_initialized()?;
        self.engine.sync_now().await
    }

    pub fn status(&self) -> Result<EngineStatus> {
        self.ensure_initialized()?;
        Ok(EngineStatus {
            network: self.monitor.status(),
            sync: self.engine.status()?,
        })
    }

    pub fn network_status(&self) -> NetworkStatus {
        self.monitor.status()
    }

    /// The host connectivity flag this session follows.
    pub fn connectivity(&self) -> &Connectivity {
        self.monitor.connectivity()
    }

    pub fn config(&self) -> OfflineConfig {
        config_of(&self.config)
    }

    /// Replace the configuration. Store limits, probe timing and the sync
    /// interval take effect immediately; nothing already stored is trimmed.
    pub fn update_config(&self, config: OfflineConfig) -> Result<()> {
        config.validate()?;
        replace_config(&self.config, config.clone());
        lock(&self.store).set_limits(config.limits());
        self.monitor.reconfigure(&config);
        self.bus.set_muted(!config.enable_notifications);
        info!("config updated");
        self.bus.emit(Event::ConfigUpdated(config));
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.on(kind, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.bus.off(id)
    }

    /// Drop one cached record. Returns whether it was cached.
    pub fn evict(&self, table: &str, record_id: &str) -> Result<bool> {
        self.ensure_initialized()?;
        lock(&self.store).remove(Collection::Cache, &cache_key(table, record_id))
    }

    pub fn clear_cache(&self) -> Result<usize> {
        self.ensure_initialized()?;
        lock(&self.store).clear(Collection::Cache, &Filter::all())
    }

    /// Drop every queued request without replaying it.
    pub fn clear_queue(&self) -> Result<usize> {
        self.ensure_initialized()?;
        self.queue.clear()
    }

    /// Queued requests in replay order.
    pub fn pending_requests(&self) -> Result<Vec<OfflineRequest>> {
        self.ensure_initialized()?;
        self.queue.dequeue_all_ordered()
    }

    pub fn failed_requests(&self) -> Result<Vec<FailedRequest>> {
        self.ensure_initialized()?;
        self.queue.dead_letters()
    }

    /// Requeue every dead letter with fresh retry counters.
    pub fn retry_failed(&self) -> Result<usize> {
        self.ensure_initialized()?;
        self.queue.retry_dead_letters()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn queue_call(
        &self,
        call: RemoteCall,
        priority: Priority,
        config: &OfflineConfig,
    ) -> Result<PerformOutcome> {
        let request = self
            .queue
            .enqueue(NewRequest::from(call.clone()).with_priority(priority))?;
        let optimistic = if config.enable_optimistic_updates {
            self.apply_optimistic(&call)?
        } else {
            None
        };
        Ok(PerformOutcome::Queued {
            request,
            optimistic,
        })
    }

    /// Applies a queued call to the cache as if the server had accepted it.
    fn apply_optimistic(&self, call: &RemoteCall) -> Result<Option<Value>> {
        let Some(record_id) = call.record_id() else {
            return Ok(None);
        };
        match call.operation {
            Operation::Create => {
                self.cache_put(&call.table, &record_id, call.payload.clone())?;
                Ok(Some(call.payload.clone()))
            }
            Operation::Update => {
                let mut data = self
                    .cached_record(&call.table, &record_id)?
                    .map(|cached| cached.data)
                    .unwrap_or(Value::Null);
                merge_patch(&mut data, &call.payload);
                self.cache_put(&call.table, &record_id, data.clone())?;
                Ok(Some(data))
            }
            Operation::Delete => {
                self.cache_remove(&call.table, &record_id)?;
                Ok(None)
            }
            Operation::Custom => Ok(None),
        }
    }

    /// Mirrors a completed call into the cache.
    fn apply_result(&self, call: &RemoteCall, result: &Value) -> Result<()> {
        let record_id = ofs_core::record_id_of(result).or_else(|| call.record_id());
        let Some(record_id) = record_id else {
            return Ok(());
        };
        match call.operation {
            Operation::Create | Operation::Update if result.is_object() => {
                self.cache_put(&call.table, &record_id, result.clone())
            }
            Operation::Create | Operation::Update => {
                self.apply_optimistic(call).map(|_| ())
            }
            Operation::Delete => self.cache_remove(&call.table, &record_id),
            Operation::Custom => Ok(()),
        }
    }

    fn refresh_cache(
        &self,
        table: &str,
        id: Option<&str>,
        records: Vec<RemoteRecord>,
    ) -> Result<Vec<OfflineData>> {
        match id {
            None => {
                let dropped = lock(&self.store).clear(Collection::Cache, &Filter::table(table))?;
                debug!(table, dropped, fetched = records.len(), "table cache refreshed");
            }
            Some(id) if records.is_empty() => {
                debug!(table, id, "record gone on server");
                self.cache_remove(table, id)?;
            }
            Some(_) => {}
        }
        let mut fresh = Vec::with_capacity(records.len());
        for record in records {
            let entry = OfflineData::new(table, record.id, record.data, self.clock.now());
            self.cache_insert(&entry)?;
            fresh.push(entry);
        }
        Ok(fresh)
    }

    fn cached(&self, table: &str, id: Option<&str>) -> Result<Vec<OfflineData>> {
        match id {
            Some(id) => Ok(self.cached_record(table, id)?.into_iter().collect()),
            None => lock(&self.store)
                .list(Collection::Cache, &Filter::table(table))?
                .iter()
                .map(Document::decode)
                .collect(),
        }
    }

    fn cached_record(&self, table: &str, record_id: &str) -> Result<Option<OfflineData>> {
        lock(&self.store)
            .get(Collection::Cache, &cache_key(table, record_id))?
            .map(|doc| doc.decode())
            .transpose()
    }

    fn cache_put(&self, table: &str, record_id: &str, data: Value) -> Result<()> {
        self.cache_insert(&OfflineData::new(table, record_id, data, self.clock.now()))
    }

    /// A record larger than the whole quota is skipped rather than failing
    /// the caller's operation.
    fn cache_insert(&self, entry: &OfflineData) -> Result<()> {
        let doc = Document::from_record(entry.id.clone(), entry.table.clone(), entry.timestamp, entry)?;
        match lock(&self.store).insert(Collection::Cache, doc) {
            Ok(_) => Ok(()),
            Err(Error::CapacityExceeded { limit, .. }) => {
                warn!(id = %entry.id, limit, "record exceeds cache quota, not cached");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn cache_remove(&self, table: &str, record_id: &str) -> Result<()> {
        lock(&self.store).remove(Collection::Cache, &cache_key(table, record_id))?;
        Ok(())
    }
}

impl<S, T> Drop for OfflineFacade<S, T> {
    fn drop(&mut self) {
        if self.initialized.load(Ordering::SeqCst) {
            self.engine.cancel();
        }
    }
}

impl<S, T> std::fmt::Debug for OfflineFacade<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineFacade")
            .field("initialized", &self.initialized.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
