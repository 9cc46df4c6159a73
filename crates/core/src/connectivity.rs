// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity reporting.
//!
//! Connectivity is only used to *trigger* drains. The engine never treats it
//! as a precondition: a drain attempted while actually offline just produces
//! transient failures, which are safe.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

/// Reachability of the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

/// Reports current reachability and notifies on transitions.
pub trait ConnectivityMonitor: Send + Sync {
    /// Current reachability.
    fn current_state(&self) -> Connectivity;

    /// Receiver that observes every state change.
    fn subscribe(&self) -> watch::Receiver<Connectivity>;
}

/// Connectivity monitor driven explicitly by the application or a probe.
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivitySignal {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _) = watch::channel(initial);
        ConnectivitySignal { tx: Arc::new(tx) }
    }

    /// Updates the state. Returns true if it changed.
    pub fn set(&self, state: Connectivity) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }
}

impl ConnectivityMonitor for ConnectivitySignal {
    fn current_state(&self) -> Connectivity {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
