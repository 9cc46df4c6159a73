// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote gateway abstraction.
//!
//! The gateway performs the actual create/update/delete against the
//! authoritative backend. It is a trait so the engine can be driven by the
//! WebSocket gateway in production and by scripted doubles in tests.
//!
//! Failures are classified into [`FailureClass::Transient`] (retried with
//! backoff) and [`FailureClass::Permanent`] (dead-lettered).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::op::{Action, DeliveryFailure, Entity, FailureClass, OpId, QueuedOperation};

/// Backend call for each entity/action pair.
pub fn route(entity: Entity, action: Action) -> &'static str {
    match (entity, action) {
        (Entity::Sale, Action::Create) => "sales.create",
        (Entity::Sale, Action::Update) => "sales.update",
        (Entity::Sale, Action::Delete) => "sales.delete",
        (Entity::Product, Action::Create) => "products.create",
        (Entity::Product, Action::Update) => "products.update",
        (Entity::Product, Action::Delete) => "products.delete",
    }
}

impl Entity {
    /// Backend call for `action` on this entity.
    pub fn route(self, action: Action) -> &'static str {
        route(self, action)
    }
}

/// A single mutation presented to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyRequest {
    /// Repeated deliveries carry the same key; the remote applies it once.
    pub idempotency_key: OpId,
    pub entity: Entity,
    pub action: Action,
    pub target: String,
    pub payload: serde_json::Value,
}

impl ApplyRequest {
    pub fn from_operation(op: &QueuedOperation) -> Self {
        ApplyRequest {
            idempotency_key: op.id,
            entity: op.entity,
            action: op.action,
            target: op.target.clone(),
            payload: op.payload.clone(),
        }
    }

    /// Backend call this request is routed to.
    pub fn route(&self) -> &'static str {
        route(self.entity, self.action)
    }
}

/// Acknowledgment from the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub idempotency_key: OpId,
    /// True if the remote had already applied this key.
    #[serde(default)]
    pub duplicate: bool,
}

/// Error type for gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No response within the request timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established or was lost.
    #[error("network error: {0}")]
    Network(String),

    /// The remote asked the client to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The payload was rejected as invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The mutation conflicts with remote state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other status reported by the remote.
    #[error("remote returned {code}: {message}")]
    Status { code: u16, message: String },
}

impl GatewayError {
    /// Maps an HTTP-style status code onto a gateway error.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            429 => GatewayError::RateLimited(message),
            409 => GatewayError::Conflict(message),
            400 | 422 => GatewayError::Validation(message),
            _ => GatewayError::Status { code, message },
        }
    }

    /// Classifies the failure for the retry policy.
    pub fn class(&self) -> FailureClass {
        match self {
            GatewayError::Timeout(_) | GatewayError::Network(_) | GatewayError::RateLimited(_) => {
                FailureClass::Transient
            }
            GatewayError::Validation(_) | GatewayError::Conflict(_) => FailureClass::Permanent,
            GatewayError::Status { code, .. } => match code {
                408 | 425 | 429 => FailureClass::Transient,
                500..=599 => FailureClass::Transient,
                _ => FailureClass::Permanent,
            },
        }
    }

    /// Converts into the failure record stored on the operation.
    pub fn to_failure(&self) -> DeliveryFailure {
        DeliveryFailure {
            class: self.class(),
            message: self.to_string(),
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Performs mutations against the authoritative backend.
pub trait RemoteGateway: Send + Sync {
    /// Applies one mutation.
    ///
    /// Implementations must honour `request.idempotency_key`: applying the
    /// same key twice has the effect of applying it once.
    fn apply(
        &self,
        request: ApplyRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Ack>> + Send + '_>>;
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
