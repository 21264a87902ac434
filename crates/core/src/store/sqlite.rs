// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed store that survives process restarts.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;
use tracing::debug;

use super::{
    capacity_exceeded, merge_patch, not_found, quota_victims, Collection, Document, Filter, Limits,
    Store,
};
use crate::error::{Result, StorageError};

/// SQL schema for the document store.
pub const SCHEMA: &str = r#"
-- One row per stored document; `seq` breaks timestamp ties in insertion order
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    table_name TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    size INTEGER NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_order ON documents(collection, timestamp, seq);
CREATE INDEX IF NOT EXISTS idx_documents_table ON documents(collection, table_name);
"#;

/// Apply the schema and any upgrades to an open connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate_add_size(conn)?;
    Ok(())
}

/// Migration: stores created before quota tracking lack the `size` column.
fn migrate_add_size(conn: &Connection) -> Result<()> {
    let has_size: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info('documents') WHERE name = 'size'",
        [],
        |row| row.get(0),
    )?;
    if !has_size {
        conn.execute(
            "ALTER TABLE documents ADD COLUMN size INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
        conn.execute("UPDATE documents SET size = length(body)", [])?;
    }
    Ok(())
}

/// Timestamps are stored as fixed-width UTC strings so they sort lexically.
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, id: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupted(format!("invalid timestamp '{value}' on document '{id}'")))
}

fn corrupted(message: String) -> crate::error::Error {
    StorageError::CorruptedData(message).into()
}

/// Columns as read from disk, before validation.
struct RawDocument {
    id: String,
    table: String,
    timestamp: String,
    body: String,
}

impl RawDocument {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawDocument {
            id: row.get(0)?,
            table: row.get(1)?,
            timestamp: row.get(2)?,
            body: row.get(3)?,
        })
    }

    fn into_document(self) -> Result<Document> {
        let timestamp = parse_timestamp(&self.timestamp, &self.id)?;
        let body: Value = serde_json::from_str(&self.body)
            .map_err(|e| corrupted(format!("invalid body on document '{}': {e}", self.id)))?;
        Ok(Document {
            id: self.id,
            table: self.table,
            timestamp,
            body,
        })
    }
}

/// Durable [`Store`] on a single SQLite file.
pub struct SqliteStore {
    conn: Connection,
    limits: Limits,
}

impl SqliteStore {
    /// Open the store at `path`, creating and migrating it if needed.
    pub fn open(path: &Path, limits: Limits) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;
        debug!(path = %path.display(), "opened sqlite store");
        Ok(SqliteStore { conn, limits })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(limits: Limits) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(SqliteStore { conn, limits })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn exists(tx: &Transaction<'_>, collection: Collection, id: &str) -> Result<bool> {
    Ok(tx.query_row(
        "SELECT COUNT(*) > 0 FROM documents WHERE collection = ?1 AND id = ?2",
        params![collection.as_str(), id],
        |row| row.get(0),
    )?)
}

fn count_in(tx: &Transaction<'_>, collection: Collection) -> Result<usize> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM documents WHERE collection = ?1",
        params![collection.as_str()],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// `(id, size)` pairs oldest first, skipping `except`.
fn sizes_oldest_first(
    tx: &Transaction<'_>,
    collection: Collection,
    except: &str,
) -> Result<Vec<(String, u64)>> {
    let mut stmt = tx.prepare(
        "SELECT id, size FROM documents WHERE collection = ?1 AND id != ?2
         ORDER BY timestamp, seq",
    )?;
    let rows = stmt
        .query_map(params![collection.as_str(), except], |row| {
            let size: i64 = row.get(1)?;
            Ok((row.get::<_, String>(0)?, u64::try_from(size).unwrap_or(0)))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn delete_ids(tx: &Transaction<'_>, collection: Collection, ids: &[String]) -> Result<()> {
    for id in ids {
        tx.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
    }
    Ok(())
}

impl Store for SqliteStore {
    fn limits(&self) -> Limits {
        self.limits
    }

    fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    fn insert(&mut self, collection: Collection, doc: Document) -> Result<String> {
        let limits = self.limits;
        let size = doc.size();
        let body = doc.body.to_string();
        let tx = self.conn.transaction()?;

        let present = exists(&tx, collection, &doc.id)?;
        let victims = match collection {
            Collection::Queue => {
                if !present && count_in(&tx, collection)? >= limits.max_queue_size {
                    return Err(capacity_exceeded(collection, limits.max_queue_size));
                }
                Vec::new()
            }
            Collection::Cache => {
                let others = sizes_oldest_first(&tx, collection, &doc.id)?;
                quota_victims(
                    others.iter().map(|(id, size)| (id.as_str(), *size)),
                    size,
                    limits.storage_quota,
                )?
            }
            Collection::DeadLetter if !present => {
                let excess = (count_in(&tx, collection)? + 1).saturating_sub(limits.max_dead_letters);
                sizes_oldest_first(&tx, collection, &doc.id)?
                    .into_iter()
                    .take(excess)
                    .map(|(id, _)| id)
                    .collect()
            }
            Collection::DeadLetter => Vec::new(),
        };
        if !victims.is_empty() {
            debug!(%collection, evicted = victims.len(), "evicting to make room");
        }
        delete_ids(&tx, collection, &victims)?;

        let timestamp = format_timestamp(&doc.timestamp);
        if collection == Collection::Queue {
            // Replacing a queued request keeps its original insertion slot.
            tx.execute(
                "INSERT INTO documents (collection, id, table_name, timestamp, size, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (collection, id) DO UPDATE SET
                     table_name = excluded.table_name,
                     timestamp = excluded.timestamp,
                     size = excluded.size,
                     body = excluded.body",
                params![collection.as_str(), doc.id, doc.table, timestamp, size as i64, body],
            )?;
        } else {
            tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), doc.id],
            )?;
            tx.execute(
                "INSERT INTO documents (collection, id, table_name, timestamp, size, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![collection.as_str(), doc.id, doc.table, timestamp, size as i64, body],
            )?;
        }
        tx.commit()?;
        Ok(doc.id)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, table_name, timestamp, body FROM documents
                 WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
                RawDocument::from_row,
            )
            .optional()?;
        raw.map(RawDocument::into_document).transpose()
    }

    fn list(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, table_name, timestamp, body FROM documents
             WHERE collection = ?1 AND (?2 IS NULL OR table_name = ?2)
             ORDER BY timestamp, seq",
        )?;
        let raws = stmt
            .query_map(
                params![collection.as_str(), filter.table.as_deref()],
                RawDocument::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawDocument::into_document).collect()
    }

    fn update(&mut self, collection: Collection, id: &str, patch: &Value) -> Result<Document> {
        let tx = self.conn.transaction()?;
        let raw = tx
            .query_row(
                "SELECT id, table_name, timestamp, body FROM documents
                 WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
                RawDocument::from_row,
            )
            .optional()?
            .ok_or_else(|| not_found(collection, id))?;
        let mut doc = raw.into_document()?;
        merge_patch(&mut doc.body, patch);
        tx.execute(
            "UPDATE documents SET body = ?3, size = ?4 WHERE collection = ?1 AND id = ?2",
            params![
                collection.as_str(),
                id,
                doc.body.to_string(),
                doc.size() as i64
            ],
        )?;
        tx.commit()?;
        Ok(doc)
    }

    fn remove(&mut self, collection: Collection, id: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
        Ok(removed > 0)
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn clear(&mut self, collection: Collection, filter: &Filter) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND (?2 IS NULL OR table_name = ?2)",
            params![collection.as_str(), filter.table.as_deref()],
        )?;
        Ok(removed)
    }
}
