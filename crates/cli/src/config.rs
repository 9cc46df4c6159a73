// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Config resolution and controller wiring for the command line.
//!
//! The config file is looked up at, in order: `--config` / `TILL_CONFIG`,
//! then `<config dir>/till/config.toml`. A missing file means defaults.
//! `--state-dir` / `TILL_STATE_DIR` overrides `[queue] state_dir`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use till_core::{
    Connectivity, ConnectivitySignal, FileStore, OperationQueue, SyncConfig, SyncController,
    SystemClock,
};
use tracing::debug;

use crate::error::Result;
use crate::sync::{Endpoint, WebSocketGateway};

const CONFIG_DIR_NAME: &str = "till";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the effective configuration.
pub fn load(config_path: Option<&Path>, state_dir: Option<PathBuf>) -> Result<SyncConfig> {
    let mut config = match config_path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => {
            debug!("loading config from {}", path.display());
            SyncConfig::load(&path)?
        }
        None => SyncConfig::default(),
    };
    if let Some(dir) = state_dir {
        config.queue.state_dir = Some(dir);
    }
    Ok(config)
}

/// A controller over the on-disk queue plus the handles that drive it.
pub struct Session {
    pub controller: SyncController,
    pub signal: ConnectivitySignal,
    pub endpoint: Endpoint,
}

impl Session {
    /// Opens the queue in the configured state directory.
    ///
    /// Connectivity starts `Offline`: nothing is delivered until a command
    /// probes the remote and flips the signal.
    pub fn open(config: &SyncConfig) -> Result<Self> {
        let endpoint = Endpoint::from_url(&config.remote.url)?;
        let state_dir = config.state_dir();
        let store = FileStore::open(&state_dir)?;
        let clock = Arc::new(SystemClock);
        let queue = OperationQueue::open(store, chrono::Utc::now())?;

        let signal = ConnectivitySignal::new(Connectivity::Offline);
        let gateway = Arc::new(WebSocketGateway::new(
            config.remote.url.clone(),
            Duration::from_secs(config.remote.connect_timeout_secs),
        ));
        let controller = SyncController::new(
            queue,
            gateway,
            Arc::new(signal.clone()),
            clock,
            config.engine_options(),
        );

        debug!("opened queue in {}", state_dir.display());
        Ok(Session {
            controller,
            signal,
            endpoint,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
