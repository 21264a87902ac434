// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[test]
fn offline_data_id_is_derived_from_table_and_record() {
    let a = OfflineData::new("client", "c-1", json!({ "v": 1 }), Utc::now());
    let b = OfflineData::new("client", "c-1", json!({ "v": 2 }), Utc::now());
    let c = OfflineData::new("invoice", "c-1", json!({ "v": 1 }), Utc::now());

    assert_eq!(a.id, "client:c-1");
    assert_eq!(a.id, b.id);
    assert_ne!(a.id, c.id);
}

#[parameterized(
    string = { json!({ "id": "abc" }), Some("abc") },
    number = { json!({ "id": 42 }), Some("42") },
    empty_string = { json!({ "id": "" }), None },
    null = { json!({ "id": null }), None },
    missing = { json!({ "name": "x" }), None },
    not_object = { json!([1, 2]), None },
)]
fn record_id_extraction(payload: Value, expected: Option<&str>) {
    assert_eq!(record_id_of(&payload).as_deref(), expected);
}
