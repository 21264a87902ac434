// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable document storage.
//!
//! A [`Store`] holds three logically partitioned collections: the pending
//! request queue, the record cache, and the dead-letter list. Documents are
//! JSON bodies keyed by id and indexed by table and timestamp.
//!
//! Capacity rules differ per collection:
//!
//! - [`Collection::Queue`] refuses inserts beyond `max_queue_size`.
//! - [`Collection::Cache`] is a best-effort cache bounded by
//!   `storage_quota` bytes and evicts its oldest entries to make room.
//! - [`Collection::DeadLetter`] keeps the newest `max_dead_letters` entries.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{run_migrations, SqliteStore, SCHEMA};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A partition of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Queue,
    Cache,
    DeadLetter,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Queue, Collection::Cache, Collection::DeadLetter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Queue => "queue",
            Collection::Cache => "cache",
            Collection::DeadLetter => "dead_letter",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored JSON body with the metadata the store indexes on.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub table: String,
    pub timestamp: DateTime<Utc>,
    pub body: Value,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        timestamp: DateTime<Utc>,
        body: Value,
    ) -> Self {
        Document {
            id: id.into(),
            table: table.into(),
            timestamp,
            body,
        }
    }

    /// Serializes `record` into a document body.
    pub fn from_record<R: Serialize>(
        id: impl Into<String>,
        table: impl Into<String>,
        timestamp: DateTime<Utc>,
        record: &R,
    ) -> Result<Self> {
        Ok(Document::new(id, table, timestamp, serde_json::to_value(record)?))
    }

    /// Deserializes the body back into a typed record.
    pub fn decode<R: DeserializeOwned>(&self) -> Result<R> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Size of the serialized body in bytes; what the cache quota counts.
    pub fn size(&self) -> u64 {
        self.body.to_string().len() as u64
    }
}

/// Narrows `list` and `clear` to one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub table: Option<String>,
}

impl Filter {
    pub fn all() -> Self {
        Filter::default()
    }

    pub fn table(table: impl Into<String>) -> Self {
        Filter {
            table: Some(table.into()),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match &self.table {
            Some(table) => *table == doc.table,
            None => true,
        }
    }
}

/// Per-collection bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_queue_size: usize,
    pub storage_quota: u64,
    pub max_dead_letters: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_queue_size: 100,
            storage_quota: 50 * 1024 * 1024,
            max_dead_letters: 100,
        }
    }
}

/// Storage backend contract.
///
/// Every call is atomic for its `(collection, id)` key. There are no
/// cross-key transactions; callers serialize writers to the same key.
pub trait Store: Send {
    fn limits(&self) -> Limits;

    /// Applies new bounds. Existing entries above a lowered bound stay until
    /// the next insert into that collection.
    fn set_limits(&mut self, limits: Limits);

    /// Inserts or replaces a document, enforcing the collection's bound.
    fn insert(&mut self, collection: Collection, doc: Document) -> Result<String>;

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Documents ordered by timestamp, then insertion order.
    fn list(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>>;

    /// Applies a JSON merge patch to the stored body.
    fn update(&mut self, collection: Collection, id: &str, patch: &Value) -> Result<Document>;

    /// Returns whether a document was removed.
    fn remove(&mut self, collection: Collection, id: &str) -> Result<bool>;

    fn count(&self, collection: Collection) -> Result<usize>;

    /// Removes every matching document and returns how many were removed.
    fn clear(&mut self, collection: Collection, filter: &Filter) -> Result<usize>;
}

/// RFC 7386 merge patch: objects merge recursively, `null` deletes a key,
/// anything else replaces the target.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn capacity_exceeded(collection: Collection, limit: usize) -> Error {
    Error::CapacityExceeded {
        collection: collection.as_str(),
        limit,
    }
}

fn not_found(collection: Collection, id: &str) -> Error {
    Error::NotFound(format!("{collection}/{id}"))
}

/// Chooses which cache entries to drop so `incoming` bytes fit the quota.
///
/// `entries` must be ordered oldest first and must not contain the entry
/// being replaced.
fn quota_victims<'a>(
    entries: impl IntoIterator<Item = (&'a str, u64)>,
    incoming: u64,
    quota: u64,
) -> Result<Vec<String>> {
    if incoming > quota {
        return Err(capacity_exceeded(
            Collection::Cache,
            usize::try_from(quota).unwrap_or(usize::MAX),
        ));
    }
    let entries: Vec<(&str, u64)> = entries.into_iter().collect();
    let mut used: u64 = entries.iter().map(|(_, size)| size).sum();
    let mut victims = Vec::new();
    for (id, size) in entries {
        if used + incoming <= quota {
            break;
        }
        used -= size;
        victims.push(id.to_string());
    }
    Ok(victims)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
