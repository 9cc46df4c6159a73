// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, ordered queue of operations awaiting delivery.
//!
//! The whole queue is re-serialized on every mutation and written through
//! [`DurableStore::set`]. Each mutation first builds the next collection,
//! persists it, and only then replaces the in-memory state, so a failed write
//! leaves both the store and the queue exactly as they were.
//!
//! # Ordering
//!
//! Operations are kept in enqueue order. [`OperationQueue::peek_next`] never
//! returns an operation while an earlier one for the same
//! `(entity, target)` record is still pending, in flight, or failed.
//! Operations on unrelated records may overtake each other.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::codec::{self, QUEUE_KEY};
use crate::error::{Error, Result};
use crate::op::{Action, DeliveryFailure, Entity, OpId, OpStatus, QueuedOperation};
use crate::status::QueueStats;
use crate::store::DurableStore;

/// Message recorded on operations found in flight after a restart.
pub const INTERRUPTED_MESSAGE: &str = "delivery interrupted";

/// Ordered, persisted collection of [`QueuedOperation`]s.
pub struct OperationQueue {
    store: Box<dyn DurableStore>,
    operations: Vec<QueuedOperation>,
}

impl OperationQueue {
    /// Loads the queue from `store`, recovering operations left in flight by
    /// an interrupted process.
    pub fn open(store: impl DurableStore + 'static, now: DateTime<Utc>) -> Result<Self> {
        let operations = match store.get(QUEUE_KEY)? {
            Some(bytes) => codec::decode(&bytes)?,
            None => Vec::new(),
        };

        let mut queue = OperationQueue {
            store: Box::new(store),
            operations,
        };

        let recovered = queue.recover_interrupted(now)?;
        if recovered > 0 {
            warn!("recovered {} interrupted deliveries", recovered);
        }
        debug!("opened sync queue with {} operations", queue.len());

        Ok(queue)
    }

    /// Appends a new pending operation and persists the queue.
    ///
    /// The operation is only queued if the write succeeds.
    pub fn enqueue(
        &mut self,
        entity: Entity,
        action: Action,
        target: impl Into<String>,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<OpId> {
        let op = QueuedOperation::new(entity, action, target, payload, now);
        let id = op.id;

        let mut next = self.operations.clone();
        next.push(op);
        self.commit(next)?;

        debug!("enqueued {} {} ({})", action, entity, id);
        Ok(id)
    }

    /// Returns the earliest eligible operation, respecting per-record order.
    pub fn peek_next(&self, now: DateTime<Utc>) -> Option<QueuedOperation> {
        self.peek_next_excluding(now, &HashSet::new())
    }

    /// Like [`peek_next`](Self::peek_next), skipping operations in `exclude`.
    ///
    /// Excluded operations still block later operations on the same record.
    pub fn peek_next_excluding(
        &self,
        now: DateTime<Utc>,
        exclude: &HashSet<OpId>,
    ) -> Option<QueuedOperation> {
        let mut blocked: HashSet<(Entity, &str)> = HashSet::new();

        for op in &self.operations {
            if !op.is_outstanding() {
                continue;
            }
            // First outstanding op for a record claims it; later ones wait.
            if !blocked.insert((op.entity, op.target.as_str())) {
                continue;
            }
            if exclude.contains(&op.id) {
                continue;
            }
            if op.is_eligible(now) {
                return Some(op.clone());
            }
        }

        None
    }

    /// Marks an operation as being delivered.
    ///
    /// Fails if another operation is already in flight, if the operation is
    /// still backing off at `now`, or if an earlier operation for the same
    /// record is outstanding.
    pub fn mark_in_flight(&mut self, id: OpId, now: DateTime<Utc>) -> Result<()> {
        if let Some(other) = self
            .operations
            .iter()
            .find(|op| op.status == OpStatus::InFlight && op.id != id)
        {
            return Err(Error::AlreadyInFlight(other.id));
        }

        let index = self.index_of(id)?;
        let op = &self.operations[index];
        let blocked = self.operations[..index].iter().any(|earlier| {
            earlier.is_outstanding() && earlier.entity == op.entity && earlier.target == op.target
        });
        if op.status.can_transition_to(OpStatus::InFlight) && (blocked || !op.is_eligible(now)) {
            return Err(Error::InvalidTransition {
                id,
                from: op.status,
                to: OpStatus::InFlight,
            });
        }

        self.update(id, |op| transition(op, OpStatus::InFlight))
    }

    /// Removes an acknowledged operation.
    pub fn mark_succeeded(&mut self, id: OpId) -> Result<()> {
        let index = self.index_of(id)?;
        let op = &self.operations[index];
        if op.status != OpStatus::InFlight {
            return Err(Error::NotInFlight {
                id,
                status: op.status,
            });
        }

        let mut next = self.operations.clone();
        next.remove(index);
        self.commit(next)
    }

    /// Records a transient failure and gates the next attempt.
    pub fn mark_failed(
        &mut self,
        id: OpId,
        failure: DeliveryFailure,
        next_eligible_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update(id, |op| {
            if op.status != OpStatus::InFlight {
                return Err(Error::NotInFlight {
                    id: op.id,
                    status: op.status,
                });
            }
            transition(op, OpStatus::Failed)?;
            op.attempts = op.attempts.saturating_add(1);
            op.next_eligible_at = Some(next_eligible_at);
            op.last_error = Some(failure);
            Ok(())
        })
    }

    /// Moves an operation to the terminal dead-letter state.
    ///
    /// Returns the operation as persisted.
    pub fn mark_dead_lettered(
        &mut self,
        id: OpId,
        failure: DeliveryFailure,
    ) -> Result<QueuedOperation> {
        self.update(id, |op| {
            let was_in_flight = op.status == OpStatus::InFlight;
            transition(op, OpStatus::DeadLettered)?;
            if was_in_flight {
                op.attempts = op.attempts.saturating_add(1);
            }
            op.next_eligible_at = None;
            op.last_error = Some(failure);
            Ok(())
        })?;

        let index = self.index_of(id)?;
        Ok(self.operations[index].clone())
    }

    /// Turns operations left in flight into immediately eligible failures.
    ///
    /// Only valid while no drain is running. Returns the number recovered.
    pub fn recover_interrupted(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let stale = self
            .operations
            .iter()
            .filter(|op| op.status == OpStatus::InFlight)
            .count();
        if stale == 0 {
            return Ok(0);
        }

        let mut next = self.operations.clone();
        for op in next.iter_mut().filter(|op| op.status == OpStatus::InFlight) {
            op.status = OpStatus::Failed;
            op.attempts = op.attempts.saturating_add(1);
            op.next_eligible_at = Some(now);
            op.last_error = Some(DeliveryFailure::transient(INTERRUPTED_MESSAGE));
        }
        self.commit(next)?;

        Ok(stale)
    }

    /// Deletes dead-lettered operations enqueued before `older_than`
    /// (all of them when `None`). Returns the number removed.
    pub fn purge_dead_letters(&mut self, older_than: Option<DateTime<Utc>>) -> Result<usize> {
        let purgeable = |op: &QueuedOperation| {
            op.status == OpStatus::DeadLettered && older_than.map_or(true, |t| op.created_at < t)
        };

        let count = self.operations.iter().filter(|op| purgeable(op)).count();
        if count == 0 {
            return Ok(0);
        }

        let next = self
            .operations
            .iter()
            .filter(|op| !purgeable(op))
            .cloned()
            .collect();
        self.commit(next)?;

        debug!("purged {} dead-lettered operations", count);
        Ok(count)
    }

    /// Read-only ordered view of every operation.
    pub fn snapshot(&self) -> Vec<QueuedOperation> {
        self.operations.clone()
    }

    /// Borrowed view of every operation, in order.
    pub fn operations(&self) -> &[QueuedOperation] {
        &self.operations
    }

    /// Looks up an operation by id.
    pub fn get(&self, id: OpId) -> Option<&QueuedOperation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Dead-lettered operations, in order.
    pub fn dead_letters(&self) -> Vec<QueuedOperation> {
        self.operations
            .iter()
            .filter(|op| op.status == OpStatus::DeadLettered)
            .cloned()
            .collect()
    }

    /// Number of operations awaiting acknowledgment.
    pub fn outstanding_count(&self) -> usize {
        self.operations.iter().filter(|op| op.is_outstanding()).count()
    }

    /// Returns true if some operation is in flight.
    pub fn has_in_flight(&self) -> bool {
        self.operations
            .iter()
            .any(|op| op.status == OpStatus::InFlight)
    }

    /// Counts by status at `now`.
    pub fn stats(&self, now: DateTime<Utc>) -> QueueStats {
        let mut stats = QueueStats::default();

        for op in &self.operations {
            match op.status {
                OpStatus::Pending => stats.pending += 1,
                OpStatus::InFlight => stats.in_flight += 1,
                OpStatus::Failed => {
                    stats.failed += 1;
                    if let Some(at) = op.next_eligible_at {
                        if at > now {
                            stats.backing_off += 1;
                        }
                        stats.next_retry_at = Some(stats.next_retry_at.map_or(at, |t| t.min(at)));
                    }
                }
                OpStatus::DeadLettered => stats.dead_lettered += 1,
            }

            if op.is_outstanding() {
                stats.oldest_outstanding_at = Some(
                    stats
                        .oldest_outstanding_at
                        .map_or(op.created_at, |t| t.min(op.created_at)),
                );
            }
        }

        stats
    }

    /// Total number of operations, dead letters included.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the queue holds no operations at all.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn index_of(&self, id: OpId) -> Result<usize> {
        self.operations
            .iter()
            .position(|op| op.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Applies `f` to a copy of the operation and commits the result.
    fn update(
        &mut self,
        id: OpId,
        f: impl FnOnce(&mut QueuedOperation) -> Result<()>,
    ) -> Result<()> {
        let index = self.index_of(id)?;
        let mut next = self.operations.clone();
        f(&mut next[index])?;
        self.commit(next)
    }

    /// Persists `next` and, on success, makes it the current state.
    fn commit(&mut self, next: Vec<QueuedOperation>) -> Result<()> {
        let bytes = codec::encode(&next).map_err(|e| Error::Persistence(e.to_string()))?;
        self.store.set(QUEUE_KEY, &bytes)?;
        self.operations = next;
        Ok(())
    }
}

fn transition(op: &mut QueuedOperation, to: OpStatus) -> Result<()> {
    if !op.status.can_transition_to(to) {
        return Err(Error::InvalidTransition {
            id: op.id,
            from: op.status,
            to,
        });
    }
    op.status = to;
    Ok(())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
