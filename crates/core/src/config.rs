// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync configuration.
//!
//! Configuration is stored as TOML. Every field has a default, so an absent
//! file or an empty one yields a working setup:
//!
//! ```toml
//! [queue]
//! state_dir = "/var/lib/till"
//!
//! [retry]
//! base_backoff_ms = 1000
//! max_backoff_ms = 300000
//! jitter_ratio = 0.2
//! request_timeout_ms = 10000
//! max_attempts = 0        # 0 = retry transient failures indefinitely
//! max_age_secs = 0        # 0 = never expire
//!
//! [sync]
//! retry_interval_secs = 30
//!
//! [remote]
//! url = "ws://127.0.0.1:7890"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::backoff::BackoffPolicy;
use crate::engine::EngineOptions;
use crate::error::{Error, Result};

/// Directory name used under the platform state directory.
const STATE_DIR_NAME: &str = "till";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub queue: QueueConfig,
    pub retry: RetryConfig,
    pub sync: WatchConfig,
    pub remote: RemoteConfig,
}

/// Where the durable queue lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Directory for the queue store. Defaults to the platform state dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

/// Retry and classification policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Backoff after the first transient failure (default: 1000).
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Upper bound for backoff (default: 300000).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Random jitter as a fraction of the backoff, in [0, 1) (default: 0.2).
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    /// Bound on each remote call (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Dead-letter after this many transient failures. 0 = unlimited.
    #[serde(default)]
    pub max_attempts: u32,
    /// Dead-letter operations older than this when they fail again. 0 = never.
    #[serde(default)]
    pub max_age_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter_ratio: default_jitter_ratio(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: 0,
            max_age_secs: 0,
        }
    }
}

/// Background drain scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Periodic drain for backoff-expired operations. 0 = only on reconnect.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

/// Remote store endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL of the remote store (default: ws://127.0.0.1:7890).
    #[serde(default = "default_remote_url")]
    pub url: String,
    /// Reachability probe interval in seconds (default: 5).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Max time to wait for a connection in seconds (default: 5).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: default_remote_url(),
            probe_interval_secs: default_probe_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    300_000
}

fn default_jitter_ratio() -> f64 {
    0.2
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_retry_interval_secs() -> u64 {
    30
}

fn default_remote_url() -> String {
    "ws://127.0.0.1:7890".to_string()
}

fn default_probe_interval_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl SyncConfig {
    /// Loads configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Config(format!("failed to read config: {}", e))),
        };
        Self::parse(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))
    }

    /// Rejects settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        let retry = &self.retry;
        if !(0.0..1.0).contains(&retry.jitter_ratio) {
            return Err(Error::Config(format!(
                "retry.jitter_ratio must be in [0, 1), got {}",
                retry.jitter_ratio
            )));
        }
        if retry.request_timeout_ms == 0 {
            return Err(Error::Config(
                "retry.request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if retry.base_backoff_ms == 0 {
            return Err(Error::Config(
                "retry.base_backoff_ms must be greater than 0".to_string(),
            ));
        }
        if retry.base_backoff_ms > retry.max_backoff_ms {
            return Err(Error::Config(format!(
                "retry.base_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                retry.base_backoff_ms, retry.max_backoff_ms
            )));
        }
        if self.remote.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "remote.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }
        parse_remote_url(&self.remote.url)?;
        Ok(())
    }

    /// Directory holding the durable queue.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.queue.state_dir {
            return dir.clone();
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .map(|d| d.join(STATE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(".till"))
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.retry.base_backoff_ms),
            Duration::from_millis(self.retry.max_backoff_ms),
            self.retry.jitter_ratio,
        )
    }

    /// Engine settings derived from the `[retry]` section.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            backoff: self.backoff_policy(),
            request_timeout: Duration::from_millis(self.retry.request_timeout_ms),
            max_attempts: (self.retry.max_attempts > 0).then_some(self.retry.max_attempts),
            max_age: (self.retry.max_age_secs > 0).then(|| {
                i64::try_from(self.retry.max_age_secs)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .unwrap_or(chrono::Duration::MAX)
            }),
        }
    }

    /// Periodic retry tick, if enabled.
    pub fn retry_interval(&self) -> Option<Duration> {
        (self.sync.retry_interval_secs > 0)
            .then(|| Duration::from_secs(self.sync.retry_interval_secs))
    }
}

/// Parses a `ws://` or `wss://` URL with a host.
pub fn parse_remote_url(raw: &str) -> Result<Url> {
    let invalid = |reason: &str| Error::Config(format!("invalid remote URL '{}': {}", raw, reason));

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid("must be ws:// or wss://"));
    }
    if url.host().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
