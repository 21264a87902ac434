// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::MockTransport;
use ofs_core::Operation;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    connection = { TransportError::ConnectionFailed("refused".into()), ErrorClass::Retryable },
    timeout = { TransportError::Timeout, ErrorClass::Retryable },
    request_timeout = { TransportError::Status { status: 408, message: String::new() }, ErrorClass::Retryable },
    throttled = { TransportError::Status { status: 429, message: String::new() }, ErrorClass::Retryable },
    unavailable = { TransportError::Status { status: 503, message: String::new() }, ErrorClass::Retryable },
    validation = { TransportError::Validation("name required".into()), ErrorClass::Terminal },
    conflict = { TransportError::Conflict("stale".into()), ErrorClass::Terminal },
    not_found = { TransportError::Status { status: 404, message: String::new() }, ErrorClass::Terminal },
    forbidden = { TransportError::Status { status: 403, message: String::new() }, ErrorClass::Terminal },
)]
fn default_classification(error: TransportError, expected: ErrorClass) {
    assert_eq!(DefaultClassifier.classify(&error), expected);
}

#[test]
fn closures_are_classifiers() {
    let everything_retries = |_: &TransportError| ErrorClass::Retryable;
    assert_eq!(
        everything_retries.classify(&TransportError::Validation("x".into())),
        ErrorClass::Retryable
    );
}

#[test]
fn retryable_errors_map_to_retryable_engine_errors() {
    let err = to_engine_error(TransportError::Conflict("busy".into()), ErrorClass::Retryable);
    assert!(err.is_retryable());

    let err: Error = TransportError::Timeout.into();
    assert!(matches!(err, Error::Timeout(_)));
}

#[test]
fn terminal_errors_keep_their_kind() {
    let err: Error = TransportError::Validation("name required".into()).into();
    assert!(matches!(err, Error::Validation(ref m) if m == "name required"));
    assert!(err.is_terminal());

    let err: Error = TransportError::Status {
        status: 404,
        message: "gone".into(),
    }
    .into();
    assert!(matches!(err, Error::Rejected { status: 404, .. }));

    let err = to_engine_error(TransportError::Timeout, ErrorClass::Terminal);
    assert!(err.is_terminal());
}

#[tokio::test]
async fn mock_transport_replays_script_then_succeeds() {
    let transport = MockTransport::new();
    transport.push_result(Err(TransportError::Timeout));

    let call = RemoteCall::new(Operation::Create, "client", json!({ "name": "a" }));
    assert_eq!(transport.execute(&call).await, Err(TransportError::Timeout));
    assert_eq!(
        transport.execute(&call).await.unwrap(),
        json!({ "name": "a" })
    );
    assert_eq!(transport.calls().len(), 2);
}
