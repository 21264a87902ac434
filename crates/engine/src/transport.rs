// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote call abstraction.
//!
//! The application supplies a [`Transport`] that performs one remote call at
//! a time, and optionally a [`Classifier`] deciding which failures are worth
//! retrying. Tests substitute a scripted transport.

use std::future::Future;
use std::pin::Pin;

use ofs_core::{Error, RemoteCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boxed future returned by the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The server refused the payload.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server holds a conflicting version of the record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success response.
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// One record returned by a remote read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub data: Value,
}

/// Performs remote calls on behalf of the engine.
pub trait Transport: Send + Sync {
    /// Execute one mutating call and return the server's result.
    fn execute<'a>(&'a self, call: &'a RemoteCall) -> BoxFuture<'a, TransportResult<Value>>;

    /// Read one record (`id` given) or a whole table.
    fn fetch<'a>(
        &'a self,
        table: &'a str,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<Vec<RemoteRecord>>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute<'a>(&'a self, call: &'a RemoteCall) -> BoxFuture<'a, TransportResult<Value>> {
        (**self).execute(call)
    }

    fn fetch<'a>(
        &'a self,
        table: &'a str,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<Vec<RemoteRecord>>> {
        (**self).fetch(table, id)
    }
}

/// How the engine treats a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Keep the request queued and try again after backoff.
    Retryable,
    /// Drop the request and report the error.
    Terminal,
}

/// Decides whether a transport failure is transient.
pub trait Classifier: Send + Sync {
    fn classify(&self, error: &TransportError) -> ErrorClass;
}

impl<F> Classifier for F
where
    F: Fn(&TransportError) -> ErrorClass + Send + Sync,
{
    fn classify(&self, error: &TransportError) -> ErrorClass {
        self(error)
    }
}

/// Connection failures, timeouts, 408, 429 and 5xx are retryable; every
/// other failure is terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl Classifier for DefaultClassifier {
    fn classify(&self, error: &TransportError) -> ErrorClass {
        match error {
            TransportError::ConnectionFailed(_) | TransportError::Timeout => ErrorClass::Retryable,
            TransportError::Status { status, .. } if *status == 408 || *status == 429 => {
                ErrorClass::Retryable
            }
            TransportError::Status { status, .. } if *status >= 500 => ErrorClass::Retryable,
            TransportError::Validation(_)
            | TransportError::Conflict(_)
            | TransportError::Status { .. } => ErrorClass::Terminal,
        }
    }
}

/// Maps a transport failure into the engine taxonomy under `class`.
///
/// A retryable failure always becomes `Network` or `Timeout`, so callers can
/// rely on [`Error::is_retryable`] whatever the classifier decided.
pub fn to_engine_error(error: TransportError, class: ErrorClass) -> Error {
    match (class, error) {
        (ErrorClass::Retryable, TransportError::Timeout) => Error::Timeout("transport".into()),
        (ErrorClass::Retryable, other) => Error::Network(other.to_string()),
        (ErrorClass::Terminal, TransportError::Validation(message)) => Error::Validation(message),
        (ErrorClass::Terminal, TransportError::Conflict(message)) => Error::Conflict(message),
        (ErrorClass::Terminal, TransportError::Status { status, message }) => {
            Error::Rejected { status, message }
        }
        (ErrorClass::Terminal, other) => Error::Rejected {
            status: 0,
            message: other.to_string(),
        },
    }
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        let class = DefaultClassifier.classify(&error);
        to_engine_error(error, class)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
