// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cached records for read-through access while offline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A local copy of one server record.
///
/// The `id` is derived from `(table, record_id)`, so writing the same record
/// twice supersedes the earlier entry rather than adding a second one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineData {
    pub id: String,
    pub table: String,
    pub record_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl OfflineData {
    pub fn new(
        table: impl Into<String>,
        record_id: impl Into<String>,
        data: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let table = table.into();
        let record_id = record_id.into();
        OfflineData {
            id: cache_key(&table, &record_id),
            table,
            record_id,
            data,
            timestamp,
        }
    }
}

/// Store key for a cached record.
pub fn cache_key(table: &str, record_id: &str) -> String {
    format!("{table}:{record_id}")
}

/// Extracts the record identifier from a payload's `id` field.
///
/// String and integer IDs are accepted; anything else is treated as absent.
pub fn record_id_of(payload: &Value) -> Option<String> {
    match payload.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
