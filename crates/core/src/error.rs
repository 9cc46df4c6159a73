// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for till-core operations.

use thiserror::Error;

use crate::op::{OpId, OpStatus};

/// All possible errors that can occur in till-core operations.
///
/// Delivery failures reported by the remote gateway are not part of this
/// enum: the sync engine records them on the queued operation instead of
/// returning them to callers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not persist sync queue: {0}")]
    Persistence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported queue schema version {0}\n  hint: the queue was written by a newer release")]
    UnsupportedSchema(u32),

    #[error("corrupted queue data: {0}")]
    CorruptedData(String),

    #[error("operation not found: {0}")]
    NotFound(OpId),

    #[error("invalid status transition for {id}: cannot go from {from} to {to}")]
    InvalidTransition {
        id: OpId,
        from: OpStatus,
        to: OpStatus,
    },

    #[error("operation {0} is already in flight")]
    AlreadyInFlight(OpId),

    #[error("operation {id} is not in flight (status: {status})")]
    NotInFlight { id: OpId, status: OpStatus },

    #[error("sync already in progress")]
    EngineBusy,

    #[error("invalid entity: '{0}'\n  hint: valid entities are: sale, product")]
    InvalidEntity(String),

    #[error("invalid action: '{0}'\n  hint: valid actions are: create, update, delete")]
    InvalidAction(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("queue store at {0} is locked by another process")]
    StoreLocked(String),
}

impl Error {
    /// Returns true for [`Error::EngineBusy`], which callers treat as a no-op.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::EngineBusy)
    }

    /// Returns true if the error came from a failed durable write.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }
}

/// A specialized Result type for till-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
