// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::{DeadCommand, GlobalArgs, OutputFormat};
use crate::display::{format_count, format_failed_line};
use crate::error::Result;

use super::{open_queue, print_json};

/// Execute a dead-letter subcommand.
pub fn run(global: &GlobalArgs, cmd: DeadCommand) -> Result<()> {
    let queue = open_queue(global, false)?;
    match cmd {
        DeadCommand::List { output } => {
            let failed = queue.dead_letters()?;
            match output {
                OutputFormat::Text => {
                    if failed.is_empty() {
                        println!("No failed requests.");
                    }
                    for entry in &failed {
                        println!("{}", format_failed_line(entry));
                    }
                    Ok(())
                }
                OutputFormat::Json => print_json(&failed),
            }
        }
        DeadCommand::Retry => {
            let requeued = queue.retry_dead_letters()?;
            println!("Requeued {}", format_count(requeued, "request"));
            let left = queue.failed_count()?;
            if left > 0 {
                println!(
                    "{} left in dead letters (queue is full)",
                    format_count(left, "request")
                );
            }
            Ok(())
        }
        DeadCommand::Clear => {
            let cleared = queue.clear_dead_letters()?;
            println!("Cleared {}", format_count(cleared, "failed request"));
            Ok(())
        }
    }
}
