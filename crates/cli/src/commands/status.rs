// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use serde::Serialize;
use till_core::{QueueStats, SyncController, SyncStatus};

use crate::cli::OutputFormat;
use crate::display::format_status;
use crate::error::Result;

use super::write_json;

#[derive(Serialize)]
struct StatusJson {
    status: SyncStatus,
    stats: QueueStats,
}

pub async fn run(
    controller: &SyncController,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let status = controller.status().await;
    let stats = controller.stats().await;

    match output {
        OutputFormat::Text => writeln!(out, "{}", format_status(status, &stats))?,
        OutputFormat::Json => write_json(out, &StatusJson { status, stats })?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
