// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued operations: the unit of durable sync work.
//!
//! Every mutation the application could not complete online is captured as a
//! [`QueuedOperation`]. Its [`OpId`] is assigned once at enqueue time and is
//! presented to the remote store as the idempotency key, so a retried delivery
//! of an operation the remote already applied has no second effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for a queued operation (UUID v4).
///
/// Doubles as the idempotency key for the remote gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(Uuid);

impl OpId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        OpId(Uuid::new_v4())
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OpId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(OpId)
            .map_err(|e| Error::CorruptedData(format!("invalid operation id '{s}': {e}")))
    }
}

/// The aggregate an operation targets.
///
/// Closed on purpose: adding an entity means adding a route in
/// [`crate::gateway::route`], which the compiler checks exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// A recorded sale transaction.
    Sale,
    /// A product in the inventory.
    Product,
}

impl Entity {
    /// All entities, in display order.
    pub const ALL: [Entity; 2] = [Entity::Sale, Entity::Product];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Sale => "sale",
            Entity::Product => "product",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Entity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sale" | "sales" => Ok(Entity::Sale),
            "product" | "products" => Ok(Entity::Product),
            _ => Err(Error::InvalidEntity(s.to_string())),
        }
    }
}

/// The kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(Error::InvalidAction(s.to_string())),
        }
    }
}

/// Delivery status of a queued operation.
///
/// ```text
/// Pending ──► InFlight ──► (removed on success)
///                │
///                ├──► Failed ──(backoff expired)──► Pending
///                └──► DeadLettered (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    /// Waiting to be delivered.
    Pending,
    /// Currently being delivered. At most one operation holds this status.
    InFlight,
    /// Last delivery failed transiently; eligible again after `next_eligible_at`.
    Failed,
    /// Permanently undeliverable. Kept for diagnostics until purged.
    DeadLettered,
}

impl OpStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpStatus::Pending => "pending",
            OpStatus::InFlight => "in_flight",
            OpStatus::Failed => "failed",
            OpStatus::DeadLettered => "dead_lettered",
        }
    }

    /// Check if a transition from this status to target is valid.
    ///
    /// `Failed -> InFlight` covers the implicit `Failed -> Pending` step once
    /// the backoff gate has expired.
    pub fn can_transition_to(&self, target: OpStatus) -> bool {
        use OpStatus::*;
        matches!(
            (self, target),
            (Pending, InFlight)
                | (Pending, DeadLettered)
                | (InFlight, Failed)
                | (InFlight, DeadLettered)
                | (Failed, Pending)
                | (Failed, InFlight)
                | (Failed, DeadLettered)
        )
    }

    /// Returns true if the operation still awaits acknowledgment.
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, OpStatus::DeadLettered)
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a delivery failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Retried after backoff (timeouts, network errors, 5xx, rate limiting).
    Transient,
    /// Dead-lettered (validation errors, conflicts, other 4xx).
    Permanent,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Transient => "transient",
            FailureClass::Permanent => "permanent",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified delivery failure recorded on the operation for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub class: FailureClass,
    pub message: String,
}

impl DeliveryFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        DeliveryFailure {
            class: FailureClass::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        DeliveryFailure {
            class: FailureClass::Permanent,
            message: message.into(),
        }
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// An operation waiting to be delivered to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Client-assigned identifier, used as the idempotency key.
    pub id: OpId,
    /// Target aggregate.
    pub entity: Entity,
    /// Kind of mutation.
    pub action: Action,
    /// Identity of the affected record within `entity` (e.g. a product id).
    pub target: String,
    /// Opaque entity state (create/update) or key (delete).
    pub payload: serde_json::Value,
    /// When the operation was enqueued.
    pub created_at: DateTime<Utc>,
    /// Delivery attempts made so far. Never decreases.
    #[serde(default)]
    pub attempts: u32,
    /// Backoff gate: not retried before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_eligible_at: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: OpStatus,
    /// Last classified failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<DeliveryFailure>,
}

fn default_status() -> OpStatus {
    OpStatus::Pending
}

impl QueuedOperation {
    /// Creates a fresh pending operation with a new id.
    pub fn new(
        entity: Entity,
        action: Action,
        target: impl Into<String>,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        QueuedOperation {
            id: OpId::new(),
            entity,
            action,
            target: target.into(),
            payload,
            created_at: now,
            attempts: 0,
            next_eligible_at: None,
            status: OpStatus::Pending,
            last_error: None,
        }
    }

    /// Returns true if `other` targets the same logical record.
    pub fn same_record(&self, other: &QueuedOperation) -> bool {
        self.entity == other.entity && self.target == other.target
    }

    /// Returns true if the operation may be dispatched at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            OpStatus::Pending => true,
            OpStatus::Failed => self.next_eligible_at.map_or(true, |at| at <= now),
            OpStatus::InFlight | OpStatus::DeadLettered => false,
        }
    }

    /// Returns true if the operation still awaits acknowledgment.
    pub fn is_outstanding(&self) -> bool {
        self.status.is_outstanding()
    }
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
