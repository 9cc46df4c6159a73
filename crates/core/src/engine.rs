// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine: drains the operation queue against the remote gateway.
//!
//! A drain repeatedly takes the next eligible operation, marks it in flight,
//! delivers it and records the outcome:
//!
//! - acknowledged operations are removed;
//! - transient failures are rescheduled with exponential backoff and are not
//!   retried again within the same pass;
//! - permanent failures are dead-lettered and published on the failure
//!   stream.
//!
//! Only one drain runs at a time. A drain requested while another is running
//! makes the running one take another pass before it returns, so an operation
//! enqueued near the end of a pass is not left behind. The queue lock is
//! released while the gateway call is awaited, so enqueueing never waits on
//! the network.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::clock::ClockSource;
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::gateway::{Ack, ApplyRequest, GatewayError, GatewayResult, RemoteGateway};
use crate::op::{DeliveryFailure, FailureClass, OpId, QueuedOperation};
use crate::queue::OperationQueue;
use crate::status::{DeadLetterEvent, DrainReport, DrainResult, DrainSummary};

/// Buffered dead-letter events per subscriber.
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Tunables for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub backoff: BackoffPolicy,
    /// Bound on each gateway call. Exceeding it is a transient failure.
    pub request_timeout: Duration,
    /// Dead-letter once this many attempts have failed transiently.
    pub max_attempts: Option<u32>,
    /// Dead-letter operations older than this when they fail transiently.
    pub max_age: Option<chrono::Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            backoff: BackoffPolicy::default(),
            request_timeout: Duration::from_secs(10),
            max_attempts: None,
            max_age: None,
        }
    }
}

/// Delivers queued operations to a [`RemoteGateway`].
pub struct SyncEngine {
    queue: Arc<Mutex<OperationQueue>>,
    gateway: Arc<dyn RemoteGateway>,
    monitor: Arc<dyn ConnectivityMonitor>,
    clock: Arc<dyn ClockSource>,
    options: EngineOptions,
    draining: AtomicBool,
    rerun: AtomicBool,
    failures: broadcast::Sender<DeadLetterEvent>,
    last_drain: std::sync::Mutex<Option<DrainReport>>,
}

/// Clears the single-flight flag when the drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    pub fn new(
        queue: Arc<Mutex<OperationQueue>>,
        gateway: Arc<dyn RemoteGateway>,
        monitor: Arc<dyn ConnectivityMonitor>,
        clock: Arc<dyn ClockSource>,
        options: EngineOptions,
    ) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        SyncEngine {
            queue,
            gateway,
            monitor,
            clock,
            options,
            draining: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            failures,
            last_drain: std::sync::Mutex::new(None),
        }
    }

    /// Shared handle to the queue this engine drains.
    pub fn queue(&self) -> &Arc<Mutex<OperationQueue>> {
        &self.queue
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns true while a drain is running.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Receives an event for every dead-lettered operation.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeadLetterEvent> {
        self.failures.subscribe()
    }

    /// Outcome of the most recent drain that ran to completion.
    pub fn last_drain(&self) -> Option<DrainReport> {
        *self.last_drain.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Delivers every eligible operation once.
    ///
    /// Returns [`DrainResult::AlreadyRunning`] if another drain holds the
    /// engine; that drain then runs one more pass while still online. Counts
    /// from every pass are combined. Persistence errors abort the drain;
    /// operations left in flight are recovered by the next drain.
    pub async fn drain(&self) -> Result<DrainResult> {
        self.rerun.store(true, Ordering::SeqCst);
        let mut outcome = DrainResult::AlreadyRunning;

        while self.rerun.load(Ordering::SeqCst) {
            let Some(_guard) = self.try_begin() else {
                break;
            };
            self.rerun.store(false, Ordering::SeqCst);

            let result = self.run().await?;
            self.record(result);
            outcome = combine(outcome, result);

            if matches!(result, DrainResult::Interrupted(_))
                || !self.monitor.current_state().is_online()
            {
                break;
            }
        }

        if outcome == DrainResult::AlreadyRunning {
            debug!("sync drain already running, another pass requested");
        }
        Ok(outcome)
    }

    fn try_begin(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| DrainGuard(&self.draining))
    }

    async fn run(&self) -> Result<DrainResult> {
        {
            let mut queue = self.queue.lock().await;
            let recovered = queue.recover_interrupted(self.clock.now())?;
            if recovered > 0 {
                warn!("recovered {} interrupted deliveries", recovered);
            }
            info!(
                "sync drain started ({} outstanding)",
                queue.outstanding_count()
            );
        }

        let mut summary = DrainSummary::default();
        let mut attempted: HashSet<OpId> = HashSet::new();

        loop {
            let next = {
                let queue = self.queue.lock().await;
                queue.peek_next_excluding(self.clock.now(), &attempted)
            };
            let Some(op) = next else {
                break;
            };

            if !attempted.is_empty() && !self.monitor.current_state().is_online() {
                summary.still_pending = self.queue.lock().await.outstanding_count();
                info!(
                    "sync drain interrupted: offline, {} still pending",
                    summary.still_pending
                );
                return Ok(DrainResult::Interrupted(summary));
            }
            attempted.insert(op.id);

            self.queue
                .lock()
                .await
                .mark_in_flight(op.id, self.clock.now())?;
            debug!(
                "delivering {} {} {} ({}, attempt {})",
                op.action,
                op.entity,
                op.target,
                op.id,
                op.attempts + 1
            );

            match self.deliver(&op).await {
                Ok(ack) => {
                    self.queue.lock().await.mark_succeeded(op.id)?;
                    summary.succeeded += 1;
                    if ack.duplicate {
                        debug!("{} was already applied remotely", op.id);
                    }
                }
                Err(err) => self.record_failure(&op, err, &mut summary).await?,
            }
        }

        summary.still_pending = self.queue.lock().await.outstanding_count();
        info!(
            "sync drain finished: {} delivered, {} deferred, {} dead-lettered, {} pending",
            summary.succeeded, summary.deferred, summary.dead_lettered, summary.still_pending
        );
        Ok(DrainResult::Drained(summary))
    }

    async fn deliver(&self, op: &QueuedOperation) -> GatewayResult<Ack> {
        let request = ApplyRequest::from_operation(op);
        let timeout = self.options.request_timeout;

        let ack = match tokio::time::timeout(timeout, self.gateway.apply(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::Timeout(timeout)),
        };
        if ack.idempotency_key != op.id {
            return Err(GatewayError::Network(format!(
                "acknowledgment for {} while delivering {}",
                ack.idempotency_key, op.id
            )));
        }
        Ok(ack)
    }

    async fn record_failure(
        &self,
        op: &QueuedOperation,
        err: GatewayError,
        summary: &mut DrainSummary,
    ) -> Result<()> {
        let now = self.clock.now();
        let failure = err.to_failure();

        if failure.class == FailureClass::Permanent {
            return self.dead_letter(op.id, failure, now, summary).await;
        }

        if let Some(reason) = self.give_up_reason(op, now) {
            let failure = DeliveryFailure::permanent(format!("{}: {}", reason, failure.message));
            return self.dead_letter(op.id, failure, now, summary).await;
        }

        let retry_at = self.options.backoff.next_eligible_at(now, op.attempts);
        warn!(
            "delivery of {} failed ({}), retrying at {}",
            op.id,
            failure.message,
            retry_at.to_rfc3339()
        );
        self.queue
            .lock()
            .await
            .mark_failed(op.id, failure, retry_at)?;
        summary.deferred += 1;
        Ok(())
    }

    /// Reason to stop retrying a transiently failing operation, if any.
    fn give_up_reason(&self, op: &QueuedOperation, now: DateTime<Utc>) -> Option<String> {
        let attempts = op.attempts.saturating_add(1);
        if let Some(max) = self.options.max_attempts {
            if attempts >= max {
                return Some(format!("gave up after {} attempts", attempts));
            }
        }
        if let Some(max_age) = self.options.max_age {
            if now.signed_duration_since(op.created_at) >= max_age {
                return Some(format!(
                    "expired after {}s in queue",
                    now.signed_duration_since(op.created_at).num_seconds()
                ));
            }
        }
        None
    }

    async fn dead_letter(
        &self,
        id: OpId,
        failure: DeliveryFailure,
        now: DateTime<Utc>,
        summary: &mut DrainSummary,
    ) -> Result<()> {
        let op = self
            .queue
            .lock()
            .await
            .mark_dead_lettered(id, failure.clone())?;
        summary.dead_lettered += 1;

        let event = DeadLetterEvent::from_operation(&op, failure, now);
        warn!("{}", event.user_message());
        // No subscribers is fine: the operation stays visible as a dead letter.
        let _ = self.failures.send(event);
        Ok(())
    }

    fn record(&self, result: DrainResult) {
        let report = DrainReport {
            finished_at: self.clock.now(),
            result,
        };
        *self.last_drain.lock().unwrap_or_else(|e| e.into_inner()) = Some(report);
    }
}

/// Folds a further pass into the result of the earlier ones.
fn combine(earlier: DrainResult, pass: DrainResult) -> DrainResult {
    let Some(before) = earlier.summary() else {
        return pass;
    };
    let total = |after: DrainSummary| DrainSummary {
        succeeded: before.succeeded + after.succeeded,
        dead_lettered: before.dead_lettered + after.dead_lettered,
        deferred: before.deferred + after.deferred,
        still_pending: after.still_pending,
    };
    match pass {
        DrainResult::AlreadyRunning => earlier,
        DrainResult::Drained(after) => DrainResult::Drained(total(after)),
        DrainResult::Interrupted(after) => DrainResult::Interrupted(total(after)),
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
