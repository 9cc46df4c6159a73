// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! till-remote: reference authoritative store for the till sync queue.
//!
//! Accepts apply requests over WebSocket, applies each idempotency key at
//! most once, and keeps a durable ledger of everything it applied.

mod ledger;
mod server;
#[cfg(test)]
mod server_tests;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// till-remote: reference remote store for till
#[derive(Parser, Debug)]
#[command(name = "till-remote")]
#[command(about = "Reference remote store for the till offline sync queue")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1:7890")]
    bind: SocketAddr,

    /// Directory for ledger storage
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Refuse the first N requests with 503 to simulate an outage
    #[arg(long, default_value = "0", value_name = "N")]
    fail_first: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let default = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting till-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = state::ServerState::new(&args.data)?;
    if args.fail_first > 0 {
        info!("  Refusing the first {} requests", args.fail_first);
        state.fail_next(args.fail_first).await;
    }

    tokio::select! {
        result = server::run(args.bind, state) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
