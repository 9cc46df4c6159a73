// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "till")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first sync queue for sales and inventory changes")]
#[command(
    long_about = "Offline-first sync queue for sales and inventory changes.\n\n\
    Mutations are queued durably on disk and delivered to the remote store \
    when it is reachable, with retry, backoff and dead-lettering."
)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "TILL_CONFIG", value_name = "path")]
    pub config: Option<PathBuf>,

    /// Directory holding the durable queue (overrides the config file)
    #[arg(long, global = true, env = "TILL_STATE_DIR", value_name = "dir")]
    pub state_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Queue a mutation for delivery
    #[command(after_help = "\
Examples:
  till enqueue sale create s1 --payload '{\"total\": 1500}'
  till enqueue product update p1 --payload '{\"quantity\": 3}'
  till enqueue product delete p1")]
    Enqueue {
        /// Entity: sale or product
        entity: String,
        /// Action: create, update or delete
        action: String,
        /// Identifier of the affected record
        #[arg(value_parser = non_empty_string)]
        target: String,
        /// JSON payload (defaults to {"id": <target>}, or the target for delete)
        #[arg(short, long)]
        payload: Option<String>,
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show sync status and queue counts
    Status {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// List queued operations in delivery order
    List {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// List operations that will not be delivered
    DeadLetters {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Delete dead-lettered operations
    Purge {
        /// Only purge operations enqueued more than this many seconds ago
        #[arg(long, value_name = "secs")]
        older_than_secs: Option<u64>,
    },

    /// Deliver queued operations now
    Sync {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Keep delivering as connectivity comes and goes (Ctrl-C to stop)
    #[command(after_help = WATCH_LOCK_NOTE)]
    Watch {
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

const WATCH_LOCK_NOTE: &str = "\
While watch runs it holds the lock on the state directory. Other till
commands using the same state directory, enqueue included, fail with
\"queue store ... is locked by another process\" until watch stops.";

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
