// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::request::Operation;

/// Generate a request ID from table, operation, and timestamp.
/// Format: {table}-{hash} where hash is first 8 hex chars of
/// SHA256(table + operation + timestamp). The table part is reduced to
/// lowercase alphanumerics so IDs stay shell and URL friendly.
pub fn generate_id(table: &str, operation: Operation, created_at: &DateTime<Utc>) -> String {
    let input = format!(
        "{}{}{}",
        table,
        operation.as_str(),
        created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    );
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}", slug(table), short_hash)
}

/// Generate a unique ID, handling collisions by appending incrementing suffix.
pub fn generate_unique_id<F>(
    table: &str,
    operation: Operation,
    created_at: &DateTime<Utc>,
    exists: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_id(table, operation, created_at);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

fn slug(table: &str) -> String {
    let slug: String = table
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if slug.is_empty() {
        "req".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
