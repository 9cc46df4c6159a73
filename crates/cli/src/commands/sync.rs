// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use till_core::{Connectivity, ConnectivitySignal, DrainResult, SyncController};

use crate::cli::OutputFormat;
use crate::display::format_drain;
use crate::error::Result;
use crate::sync::{probe_once, Endpoint};

use super::write_json;

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum SyncJson {
    Offline { outstanding: usize },
    Busy,
    Completed { result: DrainResult },
}

/// One manual drain, if the remote is reachable.
pub async fn run(
    controller: &SyncController,
    signal: &ConnectivitySignal,
    endpoint: &Endpoint,
    probe_timeout: Duration,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let state = probe_once(endpoint, probe_timeout).await;
    signal.set(state);

    let report = if state == Connectivity::Offline {
        SyncJson::Offline {
            outstanding: controller.stats().await.outstanding(),
        }
    } else {
        match controller.retry_sync().await {
            Ok(result) => SyncJson::Completed { result },
            Err(e) if e.is_busy() => SyncJson::Busy,
            Err(e) => return Err(e.into()),
        }
    };

    match output {
        OutputFormat::Json => write_json(out, &report)?,
        OutputFormat::Text => match report {
            SyncJson::Offline { outstanding } => writeln!(
                out,
                "remote {} unreachable; {} operation(s) remain queued",
                endpoint, outstanding
            )?,
            SyncJson::Busy => writeln!(out, "sync already in progress")?,
            SyncJson::Completed { result } => writeln!(out, "{}", format_drain(&result))?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
