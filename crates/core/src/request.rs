// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued operation types.
//!
//! An [`OfflineRequest`] is a mutating call that could not reach the server
//! when it was issued. It carries everything needed to replay the call
//! later, plus the bookkeeping the sync engine uses for retries.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::record_id_of;
use crate::error::{Error, Result};

/// Kind of remote mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// Application-defined call; the payload is passed through untouched.
    Custom,
}

impl Operation {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Custom => "custom",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            "custom" => Ok(Operation::Custom),
            _ => Err(Error::InvalidOperation(s.to_string())),
        }
    }
}

/// Replay priority of a queued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Sort rank; lower ranks replay first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(Error::InvalidPriority(s.to_string())),
        }
    }
}

/// One remote call as handed to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    pub table: String,
    pub operation: Operation,
    pub payload: Value,
}

impl RemoteCall {
    pub fn new(operation: Operation, table: impl Into<String>, payload: Value) -> Self {
        RemoteCall {
            table: table.into(),
            operation,
            payload,
        }
    }

    /// The record this call targets, when the payload names one.
    pub fn record_id(&self) -> Option<String> {
        record_id_of(&self.payload)
    }
}

/// A request submitted to the queue, before it is assigned an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub call: RemoteCall,
    pub priority: Priority,
}

impl NewRequest {
    pub fn new(operation: Operation, table: impl Into<String>, payload: Value) -> Self {
        NewRequest {
            call: RemoteCall::new(operation, table, payload),
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

impl From<RemoteCall> for NewRequest {
    fn from(call: RemoteCall) -> Self {
        NewRequest {
            call,
            priority: Priority::default(),
        }
    }
}

/// A pending mutation owned by the request queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineRequest {
    pub id: String,
    pub table: String,
    pub operation: Operation,
    pub payload: Value,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    /// Earliest time the next replay may be attempted (backoff).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Message of the most recent failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl OfflineRequest {
    /// Rebuilds the remote call this request replays.
    pub fn call(&self) -> RemoteCall {
        RemoteCall {
            table: self.table.clone(),
            operation: self.operation,
            payload: self.payload.clone(),
        }
    }

    /// Returns true if the backoff window has elapsed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_attempt_at {
            Some(at) => at <= now,
            None => true,
        }
    }

    /// Replay order: priority tier first, then oldest first.
    pub fn replay_order(&self, other: &Self) -> Ordering {
        self.priority
            .rank()
            .cmp(&other.priority.rank())
            .then_with(|| self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Dead-letter entry for a request that will not be retried automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub request: OfflineRequest,
    pub error: String,
    pub failed_at: DateTime<Utc>,
    /// True when the server rejected the request outright, false when it
    /// ran out of retries.
    pub terminal: bool,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
