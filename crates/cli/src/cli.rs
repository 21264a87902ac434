// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  ofsctl --store app.db status        Show queue and cache counts
  ofsctl --store app.db queue list    List pending requests in replay order
  ofsctl --store app.db dead retry    Requeue failed requests
  ofsctl config show                  Print the effective configuration";

#[derive(Parser)]
#[command(name = "ofsctl", version)]
#[command(about = "Inspect and maintain an offline sync store")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Path to the SQLite store
    #[arg(long, global = true, env = "OFSCTL_STORE", default_value = "offline.db")]
    pub store: PathBuf,

    /// TOML file with engine configuration (defaults apply when omitted)
    #[arg(long, global = true, env = "OFSCTL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show pending, failed and cached counts
    Status {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Inspect or change the request queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Inspect or requeue dead-lettered requests
    #[command(subcommand)]
    Dead(DeadCommand),

    /// Inspect or evict cached records
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List pending requests in replay order
    List {
        /// Only requests for this table
        #[arg(long, short)]
        table: Option<String>,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Queue a request for the next sync
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        ofsctl queue add create client '{\"id\": \"c1\", \"name\": \"Acme\"}'\n  \
        ofsctl queue add delete client '{\"id\": \"c1\"}' -p high"
    )]
    Add {
        /// Operation (create, update, delete, custom)
        operation: String,

        /// Target table
        table: String,

        /// JSON payload
        payload: String,

        /// Priority (high, medium, low)
        #[arg(long, short, default_value = "medium")]
        priority: String,
    },

    /// Drop pending requests without replaying them
    Clear {
        /// Only requests for this table
        #[arg(long, short)]
        table: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DeadCommand {
    /// List dead-lettered requests
    List {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Move every dead letter back into the queue with fresh retry counters
    Retry,

    /// Delete every dead letter
    Clear,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// List cached records
    List {
        /// Only records of this table
        #[arg(long, short)]
        table: Option<String>,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Drop one cached record
    #[command(arg_required_else_help = true)]
    Evict {
        /// Table of the record
        table: String,

        /// Record identifier
        record_id: String,
    },

    /// Drop every cached record
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
