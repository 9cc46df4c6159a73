// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only ledger of applied requests.
//!
//! One JSON object per line, fsynced on every append. Replaying the ledger
//! rebuilds the record store and the set of seen idempotency keys.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use till_core::{ApplyRequest, Result};

/// A request the store accepted, with the time it took effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub applied_at: DateTime<Utc>,
    pub request: ApplyRequest,
}

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Opens the ledger at `path` and returns it with every entry so far.
    ///
    /// A truncated final line (crash during append) is ignored.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<LedgerEntry>)> {
        let path = path.as_ref().to_path_buf();
        let mut entries = Vec::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let mut lines = reader.lines().peekable();
            while let Some(line) = lines.next() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str(&line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) if lines.peek().is_none() => {
                        tracing::warn!("ignoring torn ledger tail: {}", e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok((Ledger { path }, entries))
    }

    pub fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
