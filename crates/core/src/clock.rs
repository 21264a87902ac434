// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock abstraction.
//!
//! Every timestamp the engine records comes from a [`ClockSource`], so tests
//! can drive backoff and ordering with a [`ManualClock`]. [`MonotonicClock`]
//! layers a strictly increasing guarantee on top, which the request queue
//! relies on to order items enqueued within the same millisecond.

use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeDelta, Utc};

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock handle shared between engine components.
pub type SharedClock = Arc<dyn ClockSource>;

/// System clock implementation using `chrono::Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Moves the clock to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), AtomicOrdering::SeqCst);
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), AtomicOrdering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.millis.load(AtomicOrdering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }
}

/// A clock wrapper that never returns the same instant twice.
///
/// When the underlying clock stalls or goes backwards, the last issued
/// timestamp is bumped by one microsecond instead.
pub struct MonotonicClock<C: ClockSource = SystemClock> {
    clock: C,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl<C: ClockSource> MonotonicClock<C> {
    pub fn new(clock: C) -> Self {
        MonotonicClock {
            clock,
            last: Mutex::new(None),
        }
    }

    /// Generates a timestamp strictly greater than every previous one.
    pub fn now(&self) -> DateTime<Utc> {
        let physical = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let next = match *last {
            Some(prev) if physical <= prev => prev + TimeDelta::microseconds(1),
            _ => physical,
        };
        *last = Some(next);
        next
    }

    /// Raises the floor so later timestamps sort after `seen`.
    ///
    /// Used after reopening a store whose records may be ahead of the
    /// current wall clock.
    pub fn observe(&self, seen: DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(prev) if seen <= prev => {}
            _ => *last = Some(seen),
        }
    }

    /// Reads the underlying clock without the monotonic adjustment.
    pub fn wall(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
