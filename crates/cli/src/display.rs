// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use till_core::{DeadLetterEvent, DrainResult, OpStatus, QueueStats, QueuedOperation, SyncStatus};

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Multi-line status report.
pub fn format_status(status: SyncStatus, stats: &QueueStats) -> String {
    let mut lines = vec![format!("Status: {}", status)];
    lines.push(format!(
        "Queue: {} pending, {} failed ({} backing off), {} dead-lettered",
        stats.pending + stats.in_flight,
        stats.failed,
        stats.backing_off,
        stats.dead_lettered
    ));
    if let Some(at) = stats.oldest_outstanding_at {
        lines.push(format!("Oldest: {}", timestamp(at)));
    }
    if let Some(at) = stats.next_retry_at {
        lines.push(format!("Next retry: {}", timestamp(at)));
    }
    lines.join("\n")
}

/// One line per operation: id, status, what, attempts, last error.
pub fn format_operation(op: &QueuedOperation) -> String {
    let mut line = format!(
        "{}  {:<13} {} {} {}",
        op.id,
        op.status.as_str(),
        op.action,
        op.entity,
        op.target
    );
    if op.attempts > 0 {
        line.push_str(&format!("  attempts={}", op.attempts));
    }
    if op.status == OpStatus::Failed {
        if let Some(at) = op.next_eligible_at {
            line.push_str(&format!("  retry at {}", timestamp(at)));
        }
    }
    if let Some(err) = &op.last_error {
        line.push_str(&format!("  ({})", err));
    }
    line
}

pub fn format_drain(result: &DrainResult) -> String {
    match result {
        DrainResult::AlreadyRunning => "sync already in progress".to_string(),
        DrainResult::Drained(s) | DrainResult::Interrupted(s) => {
            let mut line = format!(
                "delivered {}, deferred {}, dead-lettered {}, {} pending",
                s.succeeded, s.deferred, s.dead_lettered, s.still_pending
            );
            if matches!(result, DrainResult::Interrupted(_)) {
                line.push_str(" (interrupted: remote unreachable)");
            }
            line
        }
    }
}

pub fn format_dead_letter(event: &DeadLetterEvent) -> String {
    format!("{}: {}", event.id, event.user_message())
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
