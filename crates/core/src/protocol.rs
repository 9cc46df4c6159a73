// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the sync client and the remote store.
//!
//! Every frame is a JSON text message tagged by `type`:
//! - the client sends `apply` requests (one at a time) and `ping`s;
//! - the server answers each `apply` with `ack` or `rejected`.
//!
//! `rejected.code` follows HTTP conventions (422 validation, 409 conflict,
//! 429 rate limited, 503 unavailable) and maps onto [`GatewayError`].

use serde::{Deserialize, Serialize};

use crate::gateway::{Ack, ApplyRequest, GatewayError, GatewayResult};
use crate::op::OpId;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Apply one mutation, keyed for deduplication.
    Apply { request: ApplyRequest },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The mutation is durably applied.
    Ack {
        idempotency_key: OpId,
        /// True if the key had been applied before.
        #[serde(default)]
        duplicate: bool,
    },

    /// The mutation was not applied.
    Rejected {
        idempotency_key: OpId,
        code: u16,
        message: String,
    },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// The server could not process a frame.
    Error { message: String },
}

impl ClientMessage {
    pub fn apply(request: ApplyRequest) -> Self {
        ClientMessage::Apply { request }
    }

    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    pub fn ack(idempotency_key: OpId, duplicate: bool) -> Self {
        ServerMessage::Ack {
            idempotency_key,
            duplicate,
        }
    }

    pub fn rejected(idempotency_key: OpId, code: u16, message: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            idempotency_key,
            code,
            message: message.into(),
        }
    }

    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Interprets the message as the outcome of an `apply`.
    ///
    /// Returns `None` for messages that do not answer a request (pongs).
    /// A server `error` frame counts as a 500.
    pub fn into_outcome(self) -> Option<GatewayResult<Ack>> {
        match self {
            ServerMessage::Ack {
                idempotency_key,
                duplicate,
            } => Some(Ok(Ack {
                idempotency_key,
                duplicate,
            })),
            ServerMessage::Rejected { code, message, .. } => {
                Some(Err(GatewayError::from_status(code, message)))
            }
            ServerMessage::Error { message } => Some(Err(GatewayError::from_status(500, message))),
            ServerMessage::Pong { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
