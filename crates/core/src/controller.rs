// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Application-facing entry point for offline sync.
//!
//! The controller owns the queue and the engine, wires connectivity changes
//! to drains, and exposes status for display. Construct one per process and
//! share it by cloning; clones are cheap handles onto the same state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clock::ClockSource;
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::engine::{EngineOptions, SyncEngine};
use crate::error::{Error, Result};
use crate::gateway::RemoteGateway;
use crate::op::{Action, Entity, OpId, OpStatus, QueuedOperation};
use crate::queue::OperationQueue;
use crate::status::{DeadLetterEvent, DrainReport, DrainResult, QueueStats, SyncStatus};

#[derive(Clone)]
pub struct SyncController {
    engine: Arc<SyncEngine>,
    monitor: Arc<dyn ConnectivityMonitor>,
    clock: Arc<dyn ClockSource>,
}

impl SyncController {
    pub fn new(
        queue: OperationQueue,
        gateway: Arc<dyn RemoteGateway>,
        monitor: Arc<dyn ConnectivityMonitor>,
        clock: Arc<dyn ClockSource>,
        options: EngineOptions,
    ) -> Self {
        let engine = SyncEngine::new(
            Arc::new(Mutex::new(queue)),
            gateway,
            monitor.clone(),
            clock.clone(),
            options,
        );
        SyncController {
            engine: Arc::new(engine),
            monitor,
            clock,
        }
    }

    fn queue(&self) -> &Arc<Mutex<OperationQueue>> {
        self.engine.queue()
    }

    /// Durably records a mutation for delivery.
    ///
    /// Returns once the operation is persisted. If the remote is reachable a
    /// drain is started in the background.
    pub async fn enqueue(
        &self,
        entity: Entity,
        action: Action,
        target: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<OpId> {
        let id = self
            .queue()
            .lock()
            .await
            .enqueue(entity, action, target, payload, self.clock.now())?;

        if self.monitor.current_state().is_online() {
            self.spawn_drain();
        }
        Ok(id)
    }

    /// Starts a drain on the runtime without waiting for it.
    pub fn spawn_drain(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move { log_drain(engine.drain().await) })
    }

    /// Aggregate state for display.
    pub async fn status(&self) -> SyncStatus {
        if self.engine.is_draining() {
            return SyncStatus::Syncing;
        }

        let queue = self.queue().lock().await;
        let outstanding = queue.outstanding_count();
        if outstanding > 0 {
            SyncStatus::Queued(outstanding)
        } else if queue
            .operations()
            .iter()
            .any(|op| op.status == OpStatus::DeadLettered)
        {
            SyncStatus::Error
        } else {
            SyncStatus::Idle
        }
    }

    /// Drains after the remote became reachable again.
    ///
    /// Does nothing if a drain is already running.
    pub async fn on_connectivity_restored(&self) -> Result<DrainResult> {
        info!("connectivity restored, draining sync queue");
        self.engine.drain().await
    }

    /// Manually triggered drain.
    ///
    /// Fails with [`Error::EngineBusy`] if a drain is already running.
    pub async fn retry_sync(&self) -> Result<DrainResult> {
        match self.engine.drain().await? {
            DrainResult::AlreadyRunning => Err(Error::EngineBusy),
            result => Ok(result),
        }
    }

    /// Stream of operations that will not be delivered.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeadLetterEvent> {
        self.engine.subscribe_failures()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.monitor.current_state()
    }

    pub async fn stats(&self) -> QueueStats {
        self.queue().lock().await.stats(self.clock.now())
    }

    pub async fn snapshot(&self) -> Vec<QueuedOperation> {
        self.queue().lock().await.snapshot()
    }

    pub async fn dead_letters(&self) -> Vec<QueuedOperation> {
        self.queue().lock().await.dead_letters()
    }

    /// Deletes dead letters enqueued before `older_than` (all if `None`).
    pub async fn purge_dead_letters(&self, older_than: Option<DateTime<Utc>>) -> Result<usize> {
        self.queue().lock().await.purge_dead_letters(older_than)
    }

    pub fn last_drain(&self) -> Option<DrainReport> {
        self.engine.last_drain()
    }

    /// Runs drains in the background until `cancel` fires.
    ///
    /// Drains once at start if online, on every `Offline -> Online`
    /// transition, and every `retry_interval` while online so that
    /// operations whose backoff expired are picked up.
    pub fn spawn_watcher(
        &self,
        cancel: CancellationToken,
        retry_interval: Option<Duration>,
    ) -> JoinHandle<()> {
        let controller = self.clone();
        let mut changes = self.monitor.subscribe();

        tokio::spawn(async move {
            let mut state = *changes.borrow_and_update();
            let mut ticker = retry_interval.map(|period| {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });

            if state.is_online() {
                controller.drain_until(&cancel).await;
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            debug!("connectivity monitor closed");
                            break;
                        }
                        let next = *changes.borrow_and_update();
                        let restored = next.is_online() && !state.is_online();
                        if next != state {
                            info!("connectivity: {}", next);
                        }
                        state = next;
                        if restored {
                            controller.drain_until(&cancel).await;
                        }
                    }
                    _ = next_tick(&mut ticker) => {
                        if state.is_online() {
                            controller.drain_until(&cancel).await;
                        }
                    }
                }
            }
            debug!("sync watcher stopped");
        })
    }

    /// Drains unless cancelled first. An abandoned delivery is recovered by
    /// the next drain.
    async fn drain_until(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = self.engine.drain() => log_drain(result),
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn log_drain(result: Result<DrainResult>) {
    match result {
        Ok(DrainResult::AlreadyRunning) => debug!("drain skipped: already running"),
        Ok(_) => {}
        Err(e) => error!("sync drain failed: {}", e),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
