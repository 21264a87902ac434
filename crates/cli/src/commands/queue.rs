// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use ofs_core::{Collection, Filter, NewRequest, OfflineRequest, Operation, Priority, Store};
use serde_json::Value;

use crate::cli::{GlobalArgs, OutputFormat, QueueCommand};
use crate::display::{format_count, format_request_line};
use crate::error::{Error, Result};

use super::{load_config, open_queue, open_store, print_json};

/// Execute a queue subcommand.
pub fn run(global: &GlobalArgs, cmd: QueueCommand) -> Result<()> {
    match cmd {
        QueueCommand::List { table, output } => list(global, table, output),
        QueueCommand::Add {
            operation,
            table,
            payload,
            priority,
        } => {
            let request = parse_request(&operation, &table, &payload, &priority)?;
            let queued = open_queue(global, true)?.enqueue(request)?;
            println!("Queued {} [{}]", queued.id, queued.priority);
            Ok(())
        }
        QueueCommand::Clear { table } => {
            let config = load_config(global)?;
            let mut store = open_store(global, &config, false)?;
            let filter = table.map(Filter::table).unwrap_or_default();
            let cleared = store.clear(Collection::Queue, &filter)?;
            println!("Cleared {}", format_count(cleared, "request"));
            Ok(())
        }
    }
}

fn list(global: &GlobalArgs, table: Option<String>, output: OutputFormat) -> Result<()> {
    let queue = open_queue(global, false)?;
    let requests = match table {
        Some(table) => {
            let mut requests = queue.list(&Filter::table(table))?;
            requests.sort_by(OfflineRequest::replay_order);
            requests
        }
        None => queue.dequeue_all_ordered()?,
    };

    match output {
        OutputFormat::Text => {
            if requests.is_empty() {
                println!("No pending requests.");
            }
            for request in &requests {
                println!("{}", format_request_line(request));
            }
            Ok(())
        }
        OutputFormat::Json => print_json(&requests),
    }
}

/// Build a request from command-line strings.
pub(crate) fn parse_request(
    operation: &str,
    table: &str,
    payload: &str,
    priority: &str,
) -> Result<NewRequest> {
    let operation: Operation = operation.parse()?;
    let priority: Priority = priority.parse()?;
    let payload: Value =
        serde_json::from_str(payload).map_err(|e| Error::InvalidPayload(e.to_string()))?;
    if !payload.is_object() {
        return Err(Error::InvalidPayload(format!("got {payload}")));
    }
    Ok(NewRequest::new(operation, table, payload).with_priority(priority))
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
