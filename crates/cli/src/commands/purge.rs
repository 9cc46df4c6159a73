// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use chrono::Utc;
use till_core::SyncController;

use crate::error::Result;

/// Deletes dead letters, optionally only those older than `older_than_secs`.
pub async fn run(
    controller: &SyncController,
    older_than_secs: Option<u64>,
    out: &mut impl Write,
) -> Result<()> {
    let cutoff = older_than_secs.map(|secs| {
        let age = i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC)
    });

    let purged = controller.purge_dead_letters(cutoff).await?;
    writeln!(out, "purged {} dead-lettered operation(s)", purged)?;
    Ok(())
}

#[cfg(test)]
#[path = "purge_tests.rs"]
mod tests;
