// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use ofs_core::{cache_key, Collection, Document, Filter, OfflineData, Store};

use crate::cli::{CacheCommand, GlobalArgs, OutputFormat};
use crate::display::{format_cache_line, format_count};
use crate::error::Result;

use super::{load_config, open_store, print_json};

/// Execute a cache subcommand.
pub fn run(global: &GlobalArgs, cmd: CacheCommand) -> Result<()> {
    let config = load_config(global)?;
    let mut store = open_store(global, &config, false)?;
    match cmd {
        CacheCommand::List { table, output } => {
            let filter = table.map(Filter::table).unwrap_or_default();
            let entries = cached(&store, &filter)?;
            match output {
                OutputFormat::Text => {
                    if entries.is_empty() {
                        println!("No cached records.");
                    }
                    for entry in &entries {
                        println!("{}", format_cache_line(entry));
                    }
                    Ok(())
                }
                OutputFormat::Json => print_json(&entries),
            }
        }
        CacheCommand::Evict { table, record_id } => {
            let key = cache_key(&table, &record_id);
            if !store.remove(Collection::Cache, &key)? {
                return Err(ofs_core::Error::NotFound(format!("cached record {table}/{record_id}")).into());
            }
            println!("Evicted {table}/{record_id}");
            Ok(())
        }
        CacheCommand::Clear => {
            let cleared = store.clear(Collection::Cache, &Filter::all())?;
            println!("Cleared {}", format_count(cleared, "cached record"));
            Ok(())
        }
    }
}

/// Cached records, oldest first.
pub(crate) fn cached<S: Store>(store: &S, filter: &Filter) -> Result<Vec<OfflineData>> {
    let entries = store
        .list(Collection::Cache, filter)?
        .iter()
        .map(Document::decode)
        .collect::<ofs_core::Result<_>>()?;
    Ok(entries)
}
