// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network side of sync: the WebSocket gateway and the reachability probe.
//!
//! ```text
//! ┌────────────────┐  apply   ┌──────────────────┐  ws   ┌─────────────┐
//! │ SyncController │─────────►│ WebSocketGateway │──────►│ till-remote │
//! └────────────────┘          └──────────────────┘       └─────────────┘
//!         ▲                                                     ▲
//!         │ Online/Offline   ┌──────────┐   tcp connect         │
//!         └──────────────────│  probe   │───────────────────────┘
//!                            └──────────┘
//! ```

mod gateway;
mod probe;

pub use gateway::WebSocketGateway;
pub use probe::{probe_once, spawn_probe, Endpoint};
