// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `till` command line.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] till_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid payload: {0}\n  hint: pass a JSON value, e.g. --payload '{{\"quantity\": 3}}'")]
    InvalidPayload(String),

    #[error("invalid remote URL '{0}'\n  hint: expected ws://host[:port][/path] or wss://...")]
    InvalidUrl(String),

    #[error("could not start async runtime: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
