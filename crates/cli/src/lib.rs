// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tillrs - command line front end for the offline sync queue.
//!
//! This crate wires [`till_core::SyncController`] to an on-disk queue, a
//! WebSocket gateway and a TCP reachability probe, and exposes the `till`
//! commands on top of it.
//!
//! # Main Components
//!
//! - [`Cli`] / [`Command`] - argument parsing
//! - [`config`] - config resolution and the [`Session`](config::Session) that owns the controller
//! - [`sync`] - the WebSocket gateway and the connectivity probe
//! - [`Error`] - errors reported to the user
//!
//! # Embedding
//!
//! ```rust,ignore
//! use tillrs::config::{self, Session};
//!
//! let config = config::load(None, None)?;
//! let session = Session::open(&config)?;
//! session.controller.enqueue(Entity::Sale, Action::Create, "s1", payload).await?;
//! ```

mod cli;
mod commands;
mod display;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat};
pub use error::{Error, Result};

use std::io::Write;

use crate::commands::watch::WatchOptions;
use crate::config::Session;

/// Execute a CLI invocation. Output goes to stdout.
pub fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref(), cli.state_dir)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(e.to_string()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    runtime.block_on(async {
        let session = Session::open(&config)?;
        execute(&session, &config, cli.command, &mut out).await
    })
}

async fn execute(
    session: &Session,
    config: &till_core::SyncConfig,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    let controller = &session.controller;
    match command {
        Command::Enqueue {
            entity,
            action,
            target,
            payload,
            output,
        } => {
            commands::enqueue::run(
                controller,
                &entity,
                &action,
                &target,
                payload.as_deref(),
                output,
                out,
            )
            .await
        }
        Command::Status { output } => commands::status::run(controller, output, out).await,
        Command::List { output } => commands::list::run(controller, output, out).await,
        Command::DeadLetters { output } => {
            commands::list::dead_letters(controller, output, out).await
        }
        Command::Purge { older_than_secs } => {
            commands::purge::run(controller, older_than_secs, out).await
        }
        Command::Sync { output } => {
            let probe_timeout = std::time::Duration::from_secs(config.remote.connect_timeout_secs);
            commands::sync::run(
                controller,
                &session.signal,
                &session.endpoint,
                probe_timeout,
                output,
                out,
            )
            .await
        }
        Command::Watch { output } => {
            commands::watch::run(
                controller,
                &session.signal,
                &session.endpoint,
                WatchOptions::from_config(config),
                output,
                out,
            )
            .await
        }
    }
}
