// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ofs-core operations.

use thiserror::Error;

/// Failures of the durable store.
///
/// Never retried silently: a storage error always reaches the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// All possible errors that can occur in the offline engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("{collection} is full (limit {limit})\n  hint: sync pending changes or raise the configured limit")]
    CapacityExceeded {
        collection: &'static str,
        limit: usize,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("not initialized: call init() before using the engine")]
    NotInitialized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid operation: '{0}'\n  hint: valid operations are: create, update, delete, custom")]
    InvalidOperation(String),

    #[error("invalid priority: '{0}'\n  hint: valid priorities are: high, medium, low")]
    InvalidPriority(String),

    #[error("sync failed: {0}")]
    SyncFailed(String),
}

impl Error {
    /// Transient failures that a later attempt may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }

    /// Failures the server will keep refusing; never retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Conflict(_) | Error::Rejected { .. }
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(StorageError::Database(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(StorageError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(StorageError::Json(e))
    }
}

/// A specialized Result type for ofs-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
