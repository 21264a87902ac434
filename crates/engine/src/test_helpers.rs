// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted collaborators shared by the engine's unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use ofs_core::{
    ManualClock, MemoryStore, OfflineConfig, Operation, RemoteCall, SharedClock,
};
use serde_json::Value;

use crate::events::EventBus;
use crate::probe::{Probe, ProbeError};
use crate::queue::RequestQueue;
use crate::shared::{shared_config, shared_store, SharedConfig};
use crate::transport::{BoxFuture, RemoteRecord, Transport, TransportError, TransportResult};

/// Transport whose results are scripted per call.
///
/// Scripted results are consumed in order; once the script is empty every
/// call uses the fallback (echo the payload unless `fail_always` is set).
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<TransportResult<Value>>>,
    fail_always: Mutex<Option<TransportError>>,
    calls: Mutex<Vec<RemoteCall>>,
    records: Mutex<HashMap<String, Vec<RemoteRecord>>>,
    fetch_error: Mutex<Option<TransportError>>,
    fetches: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: TransportResult<Value>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn fail_always(&self, error: Option<TransportError>) {
        *self.fail_always.lock().unwrap() = error;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn set_records(&self, table: &str, records: Vec<RemoteRecord>) {
        self.records
            .lock()
            .unwrap()
            .insert(table.to_string(), records);
    }

    pub fn fail_fetch(&self, error: Option<TransportError>) {
        *self.fetch_error.lock().unwrap() = error;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn next_result(&self, call: &RemoteCall) -> TransportResult<Value> {
        if let Some(result) = self.script.lock().unwrap().pop_front() {
            return result;
        }
        match self.fail_always.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(call.payload.clone()),
        }
    }
}

impl Transport for MockTransport {
    fn execute<'a>(&'a self, call: &'a RemoteCall) -> BoxFuture<'a, TransportResult<Value>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(call.clone());
            let latency = *self.latency.lock().unwrap();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            self.next_result(call)
        })
    }

    fn fetch<'a>(
        &'a self,
        table: &'a str,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<Vec<RemoteRecord>>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.fetch_error.lock().unwrap().clone() {
                return Err(error);
            }
            let records = self
                .records
                .lock()
                .unwrap()
                .get(table)
                .cloned()
                .unwrap_or_default();
            Ok(match id {
                Some(id) => records.into_iter().filter(|r| r.id == id).collect(),
                None => records,
            })
        })
    }
}

/// Probe whose outcomes are scripted; succeeds instantly when the script
/// is empty.
#[derive(Default)]
pub struct MockProbe {
    script: Mutex<VecDeque<(Duration, Result<(), ProbeError>)>>,
    count: AtomicUsize,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, latency: Duration, result: Result<(), ProbeError>) {
        self.script.lock().unwrap().push_back((latency, result));
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Probe for MockProbe {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
        Box::pin(async move {
            self.count.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some((latency, result)) => {
                    tokio::time::sleep(latency).await;
                    result
                }
                None => Ok(()),
            }
        })
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub fn manual_clock() -> (Arc<ManualClock>, SharedClock) {
    let clock = Arc::new(ManualClock::new(epoch()));
    let shared: SharedClock = clock.clone();
    (clock, shared)
}

/// Config with instant retries so drains can be repeated back to back.
pub fn test_config() -> OfflineConfig {
    OfflineConfig {
        retry_delay_ms: 0,
        ..Default::default()
    }
}

pub struct QueueFixture {
    pub queue: RequestQueue<MemoryStore>,
    pub bus: Arc<EventBus>,
    pub clock: Arc<ManualClock>,
    pub config: SharedConfig,
}

pub fn queue_fixture(config: OfflineConfig) -> QueueFixture {
    let (clock, shared_clock) = manual_clock();
    let bus = Arc::new(EventBus::new(64));
    let store = shared_store(MemoryStore::new(config.limits()));
    let config = shared_config(config);
    let queue = RequestQueue::new(store, Arc::clone(&bus), shared_clock, Arc::clone(&config))
        .unwrap();
    QueueFixture {
        queue,
        bus,
        clock,
        config,
    }
}

pub fn create(table: &str, payload: Value) -> ofs_core::NewRequest {
    ofs_core::NewRequest::new(Operation::Create, table, payload)
}
