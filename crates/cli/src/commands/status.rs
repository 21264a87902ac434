// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use ofs_core::{Collection, Document, FailedRequest, Filter, Store};
use ofsync::queue::describe;
use serde::Serialize;

use crate::cli::{GlobalArgs, OutputFormat};
use crate::display::format_count;
use crate::error::Result;

use super::{load_config, open_store, print_json};

/// Counts shown by `ofsctl status`.
#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct StoreStatus {
    pub pending_requests: usize,
    pub failed_requests: usize,
    pub cached_records: usize,
    pub sync_errors: Vec<String>,
}

pub(crate) fn collect<S: Store>(store: &S) -> Result<StoreStatus> {
    let sync_errors = store
        .list(Collection::DeadLetter, &Filter::all())?
        .iter()
        .map(|doc| Document::decode::<FailedRequest>(doc).map(|f| describe(&f)))
        .collect::<ofs_core::Result<Vec<_>>>()?;
    Ok(StoreStatus {
        pending_requests: store.count(Collection::Queue)?,
        failed_requests: sync_errors.len(),
        cached_records: store.count(Collection::Cache)?,
        sync_errors,
    })
}

pub fn run(global: &GlobalArgs, output: OutputFormat) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(global, &config, false)?;
    let status = collect(&store)?;

    match output {
        OutputFormat::Text => {
            println!("store: {}", global.store.display());
            println!("pending: {}", format_count(status.pending_requests, "request"));
            println!("failed: {}", format_count(status.failed_requests, "request"));
            println!("cached: {}", format_count(status.cached_records, "record"));
            if !status.sync_errors.is_empty() {
                println!("errors:");
                for error in &status.sync_errors {
                    println!("  {error}");
                }
            }
            Ok(())
        }
        OutputFormat::Json => print_json(&status),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
