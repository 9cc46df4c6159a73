// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TCP reachability probe driving the connectivity signal.
//!
//! A successful TCP connect to the remote's host and port counts as online.
//! This says nothing about whether the remote will accept requests; the
//! gateway still classifies each failure on its own.

use std::fmt;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use till_core::config::parse_remote_url;
use till_core::{Connectivity, ConnectivitySignal};
use url::Host;

use crate::error::{Error, Result};

/// Host and port of the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Extracts the endpoint from a `ws://` or `wss://` URL.
    pub fn from_url(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidUrl(raw.to_string());

        let url = parse_remote_url(raw).map_err(|_| invalid())?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(invalid()),
        };
        let port = url.port_or_known_default().ok_or_else(invalid)?;

        Ok(Endpoint { host, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Attempts one TCP connect.
pub async fn probe_once(endpoint: &Endpoint, timeout: Duration) -> Connectivity {
    let addr = endpoint.to_string();
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => Connectivity::Online,
        Ok(Err(e)) => {
            debug!("probe {} failed: {}", addr, e);
            Connectivity::Offline
        }
        Err(_) => {
            debug!("probe {} timed out", addr);
            Connectivity::Offline
        }
    }
}

/// Probes every `interval` and publishes the result on `signal`.
pub fn spawn_probe(
    signal: ConnectivitySignal,
    endpoint: Endpoint,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let state = tokio::select! {
                        _ = cancel.cancelled() => break,
                        state = probe_once(&endpoint, timeout) => state,
                    };
                    if signal.set(state) {
                        debug!("{} is {}", endpoint, state);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
