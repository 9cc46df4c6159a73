// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running sync: probe the remote, drain on reconnect, report dead letters.

use std::io::Write;
use std::time::Duration;

use till_core::{ConnectivitySignal, SyncConfig, SyncController};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::display::format_dead_letter;
use crate::error::Result;
use crate::sync::{spawn_probe, Endpoint};

/// Timing for the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub retry_interval: Option<Duration>,
}

impl WatchOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        WatchOptions {
            probe_interval: Duration::from_secs(config.remote.probe_interval_secs.max(1)),
            probe_timeout: Duration::from_secs(config.remote.connect_timeout_secs),
            retry_interval: config.retry_interval(),
        }
    }
}

/// Watches until Ctrl-C.
pub async fn run(
    controller: &SyncController,
    signal: &ConnectivitySignal,
    endpoint: &Endpoint,
    options: WatchOptions,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {}", e);
            return;
        }
        interrupt.cancel();
    });
    watch_until(controller, signal, endpoint, options, cancel, output, out).await
}

/// Runs the probe and the drain watcher until `cancel` fires, printing each
/// dead-lettered operation as it happens.
pub async fn watch_until(
    controller: &SyncController,
    signal: &ConnectivitySignal,
    endpoint: &Endpoint,
    options: WatchOptions,
    cancel: CancellationToken,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let mut failures = controller.subscribe_failures();
    let watcher = controller.spawn_watcher(cancel.clone(), options.retry_interval);
    let probe = spawn_probe(
        signal.clone(),
        endpoint.clone(),
        options.probe_interval,
        options.probe_timeout,
        cancel.clone(),
    );
    info!("watching {} for connectivity", endpoint);

    loop {
        tokio::select! {
            biased;
            event = failures.recv() => match event {
                Ok(event) => {
                    match output {
                        OutputFormat::Text => writeln!(out, "{}", format_dead_letter(&event))?,
                        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&event)?)?,
                    }
                    out.flush()?;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("missed {} dead-letter notifications", missed);
                }
                Err(RecvError::Closed) => break,
            },
            _ = cancel.cancelled() => break,
        }
    }

    cancel.cancel();
    if let Err(e) = watcher.await {
        warn!("sync watcher ended abnormally: {}", e);
    }
    if let Err(e) = probe.await {
        warn!("connectivity probe ended abnormally: {}", e);
    }

    let outstanding = controller.stats().await.outstanding();
    info!("stopped watching; {} operation(s) remain queued", outstanding);
    Ok(())
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
