// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use serde::Serialize;
use till_core::{QueuedOperation, SyncController};

use crate::cli::OutputFormat;
use crate::display::format_operation;
use crate::error::Result;

use super::write_json;

/// JSON output structure for the list commands.
#[derive(Serialize)]
struct ListOutputJson {
    operations: Vec<QueuedOperation>,
}

fn print(
    ops: Vec<QueuedOperation>,
    empty: &str,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match output {
        OutputFormat::Text if ops.is_empty() => writeln!(out, "{}", empty)?,
        OutputFormat::Text => {
            for op in &ops {
                writeln!(out, "{}", format_operation(op))?;
            }
        }
        OutputFormat::Json => write_json(out, &ListOutputJson { operations: ops })?,
    }
    Ok(())
}

/// Every queued operation in delivery order, dead letters included.
pub async fn run(
    controller: &SyncController,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    print(controller.snapshot().await, "queue is empty", output, out)
}

pub async fn dead_letters(
    controller: &SyncController,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    print(controller.dead_letters().await, "no dead letters", output, out)
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
