// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! till-core: offline synchronization queue
//!
//! Durable queue of local mutations, a sync engine that delivers them to a
//! remote store with retry and backoff, and a controller that wires
//! connectivity changes to drains. Shared by the `till` CLI and the
//! `till-remote` reference server.

pub mod backoff;
pub mod clock;
pub mod codec;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod op;
pub mod protocol;
pub mod queue;
pub mod status;
pub mod store;

#[cfg(test)]
mod testing;

pub use backoff::BackoffPolicy;
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use connectivity::{Connectivity, ConnectivityMonitor, ConnectivitySignal};
pub use controller::SyncController;
pub use engine::{EngineOptions, SyncEngine};
pub use error::{Error, Result};
pub use gateway::{Ack, ApplyRequest, GatewayError, GatewayResult, RemoteGateway};
pub use op::{Action, DeliveryFailure, Entity, FailureClass, OpId, OpStatus, QueuedOperation};
pub use protocol::{ClientMessage, ServerMessage};
pub use queue::OperationQueue;
pub use status::{DeadLetterEvent, DrainReport, DrainResult, DrainSummary, QueueStats, SyncStatus};
pub use store::{DurableStore, FileStore, MemoryStore};
