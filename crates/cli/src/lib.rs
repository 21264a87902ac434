// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ofsctl - operator tool for offline sync stores.
//!
//! Opens the SQLite store an application's offline engine writes to and
//! lets an operator inspect the pending queue, the dead-letter list and the
//! record cache, requeue failed requests, and print the effective
//! configuration. It never talks to the remote backend.

mod cli;
mod commands;
mod display;

pub mod error;

pub use cli::{
    CacheCommand, Cli, Command, ConfigCommand, DeadCommand, GlobalArgs, OutputFormat,
    QueueCommand,
};
pub use error::{Error, Result};

/// Install the stderr log subscriber. `RUST_LOG` overrides the default
/// `warn` level.
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute a parsed command line. This is the main entry point for library
/// users and lets tests run commands without spawning a process.
pub fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Command::Status { output } => commands::status::run(&global, output),
        Command::Queue(cmd) => commands::queue::run(&global, cmd),
        Command::Dead(cmd) => commands::dead::run(&global, cmd),
        Command::Cache(cmd) => commands::cache::run(&global, cmd),
        Command::Config(ConfigCommand::Show) => commands::config::show(&global),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
