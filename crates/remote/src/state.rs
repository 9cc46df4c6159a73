// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative record store.
//!
//! Records are kept in memory keyed by entity and target. Every accepted
//! request is appended to the ledger before it takes effect, so a restart
//! replays to the same state and still recognises old idempotency keys.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use till_core::protocol::ServerMessage;
use till_core::{Action, ApplyRequest, Entity, OpId, Result};

use crate::ledger::{Ledger, LedgerEntry};

const LEDGER_FILE: &str = "ledger.jsonl";

/// What the store did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The key was applied before; nothing changed.
    Duplicate,
    Rejected { code: u16, message: String },
}

impl Outcome {
    /// Reply frame for the request carrying `key`.
    pub fn into_message(self, key: OpId) -> ServerMessage {
        match self {
            Outcome::Applied => ServerMessage::ack(key, false),
            Outcome::Duplicate => ServerMessage::ack(key, true),
            Outcome::Rejected { code, message } => ServerMessage::rejected(key, code, message),
        }
    }
}

type RecordKey = (Entity, String);

struct Store {
    records: HashMap<RecordKey, Value>,
    seen: HashSet<OpId>,
    ledger: Ledger,
    /// Requests still to be refused with 503, for outage simulation.
    unavailable: u32,
}

/// Shared server state.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<Mutex<Store>>,
}

impl ServerState {
    /// Opens (or creates) the store in `data_dir`, replaying its ledger.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let (ledger, entries) = Ledger::open(data_dir.join(LEDGER_FILE))?;

        let mut records = HashMap::new();
        let mut seen = HashSet::new();
        for entry in &entries {
            seen.insert(entry.request.idempotency_key);
            apply_effect(&mut records, &entry.request);
        }
        info!(
            "replayed {} ledger entries into {} records",
            entries.len(),
            records.len()
        );

        Ok(ServerState {
            inner: Arc::new(Mutex::new(Store {
                records,
                seen,
                ledger,
                unavailable: 0,
            })),
        })
    }

    /// Applies `request` at most once per idempotency key.
    ///
    /// Errors are ledger failures; the request did not take effect.
    pub async fn apply(&self, request: ApplyRequest) -> Result<Outcome> {
        let mut store = self.inner.lock().await;
        let key = request.idempotency_key;

        if store.unavailable > 0 {
            store.unavailable -= 1;
            return Ok(Outcome::Rejected {
                code: 503,
                message: "store temporarily unavailable".to_string(),
            });
        }
        if store.seen.contains(&key) {
            debug!("{} already applied", key);
            return Ok(Outcome::Duplicate);
        }
        if let Some((code, message)) = validate(&store.records, &request) {
            debug!("rejecting {} {}: {}", request.route(), request.target, message);
            return Ok(Outcome::Rejected { code, message });
        }

        store.ledger.append(&LedgerEntry {
            applied_at: Utc::now(),
            request: request.clone(),
        })?;
        store.seen.insert(key);
        apply_effect(&mut store.records, &request);
        debug!("applied {} {} ({})", request.route(), request.target, key);
        Ok(Outcome::Applied)
    }

    /// Current state of a record.
    #[cfg(test)]
    pub async fn record(&self, entity: Entity, target: &str) -> Option<Value> {
        let store = self.inner.lock().await;
        store.records.get(&(entity, target.to_string())).cloned()
    }

    /// Number of distinct idempotency keys applied.
    #[cfg(test)]
    pub async fn applied_count(&self) -> usize {
        self.inner.lock().await.seen.len()
    }

    /// Refuses the next `n` requests with 503.
    pub async fn fail_next(&self, n: u32) {
        self.inner.lock().await.unavailable = n;
    }
}

/// Field that must not be negative for each entity.
fn non_negative_field(entity: Entity) -> &'static str {
    match entity {
        Entity::Product => "quantity",
        Entity::Sale => "total",
    }
}

fn validate(records: &HashMap<RecordKey, Value>, request: &ApplyRequest) -> Option<(u16, String)> {
    let key = (request.entity, request.target.clone());
    if request.action == Action::Update && !records.contains_key(&key) {
        return Some((
            409,
            format!("{} {} does not exist", request.entity, request.target),
        ));
    }

    if request.action != Action::Delete {
        let field = non_negative_field(request.entity);
        let negative = request
            .payload
            .get(field)
            .and_then(Value::as_f64)
            .is_some_and(|v| v < 0.0);
        if negative {
            return Some((422, format!("{} must not be negative", field)));
        }
    }
    None
}

fn apply_effect(records: &mut HashMap<RecordKey, Value>, request: &ApplyRequest) {
    let key = (request.entity, request.target.clone());
    match request.action {
        Action::Create => {
            records.insert(key, request.payload.clone());
        }
        Action::Update => match (records.get_mut(&key), &request.payload) {
            (Some(Value::Object(current)), Value::Object(changes)) => {
                for (field, value) in changes {
                    current.insert(field.clone(), value.clone());
                }
            }
            _ => {
                records.insert(key, request.payload.clone());
            }
        },
        Action::Delete => {
            records.remove(&key);
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
