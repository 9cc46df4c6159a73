// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Status and metrics reported by the sync engine and controller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::op::{Action, DeliveryFailure, Entity, OpId, QueuedOperation};

/// Coarse sync state for UI badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Nothing queued, nothing failed.
    Idle,
    /// A drain is running.
    Syncing,
    /// Operations awaiting acknowledgment.
    Queued(usize),
    /// Nothing queued, but dead-lettered operations need attention.
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Queued(n) => write!(f, "queued ({n})"),
            SyncStatus::Error => write!(f, "error"),
        }
    }
}

/// Counts over the current queue contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub failed: usize,
    /// Failed operations whose backoff gate has not expired yet.
    pub backing_off: usize,
    pub dead_lettered: usize,
    /// Enqueue time of the oldest operation still awaiting acknowledgment.
    pub oldest_outstanding_at: Option<DateTime<Utc>>,
    /// Earliest backoff gate among failed operations.
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl QueueStats {
    /// Operations that have not been acknowledged or dead-lettered.
    pub fn outstanding(&self) -> usize {
        self.pending + self.in_flight + self.failed
    }
}

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    /// Acknowledged by the remote and removed from the queue.
    pub succeeded: usize,
    /// Classified as permanent failures during this pass.
    pub dead_lettered: usize,
    /// Transient failures rescheduled with backoff during this pass.
    pub deferred: usize,
    /// Operations still awaiting acknowledgment after the pass.
    pub still_pending: usize,
}

/// Result of [`SyncEngine::drain`](crate::engine::SyncEngine::drain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "summary", rename_all = "snake_case")]
pub enum DrainResult {
    /// Another drain was running; nothing was done.
    AlreadyRunning,
    /// No eligible operation is left.
    Drained(DrainSummary),
    /// Connectivity was lost mid-drain; remaining work waits for reconnect.
    Interrupted(DrainSummary),
}

impl DrainResult {
    /// Returns the pass summary, if a pass ran.
    pub fn summary(&self) -> Option<DrainSummary> {
        match self {
            DrainResult::AlreadyRunning => None,
            DrainResult::Drained(s) | DrainResult::Interrupted(s) => Some(*s),
        }
    }
}

/// Published on the failure stream when an operation is dead-lettered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadLetterEvent {
    pub id: OpId,
    pub entity: Entity,
    pub action: Action,
    pub target: String,
    pub attempts: u32,
    pub failure: DeliveryFailure,
    pub at: DateTime<Utc>,
}

impl DeadLetterEvent {
    pub fn from_operation(op: &QueuedOperation, failure: DeliveryFailure, at: DateTime<Utc>) -> Self {
        DeadLetterEvent {
            id: op.id,
            entity: op.entity,
            action: op.action,
            target: op.target.clone(),
            attempts: op.attempts,
            failure,
            at,
        }
    }

    /// Human-readable message for surfacing to the user.
    pub fn user_message(&self) -> String {
        let what = match (self.action, self.entity) {
            (Action::Create, Entity::Sale) => "record sale".to_string(),
            (action, entity) => format!("{action} {entity}"),
        };
        format!(
            "could not {what} {}: {} (please check and retry)",
            self.target, self.failure.message
        )
    }
}

/// Outcome of the most recent completed drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub finished_at: DateTime<Utc>,
    pub result: DrainResult,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
