// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted test doubles shared by the engine and controller tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use crate::gateway::{Ack, ApplyRequest, GatewayError, GatewayResult, RemoteGateway};
use crate::op::OpId;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// One scripted reply.
pub enum Reply {
    Ack,
    Fail(GatewayError),
    /// Never answers.
    Hang,
    /// Answers once the notify fires.
    Wait(Arc<Notify>),
}

type Validator = Box<dyn Fn(&ApplyRequest) -> Option<GatewayError> + Send + Sync>;
type Hook = Box<dyn Fn(&ApplyRequest) + Send + Sync>;

/// In-memory remote: replies from a script, then acknowledges.
///
/// Applies each idempotency key at most once, like a real remote.
#[derive(Default)]
pub struct MockGateway {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<ApplyRequest>>,
    applied: Mutex<Vec<ApplyRequest>>,
    seen: Mutex<HashSet<OpId>>,
    validator: Option<Validator>,
    hook: Option<Hook>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects requests for which `f` returns an error, before the script.
    pub fn with_validator(
        mut self,
        f: impl Fn(&ApplyRequest) -> Option<GatewayError> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(f));
        self
    }

    /// Runs `f` at the start of every call.
    pub fn with_hook(mut self, f: impl Fn(&ApplyRequest) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(f));
        self
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Every request received, including failed ones.
    pub fn calls(&self) -> Vec<ApplyRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests that took effect, in order.
    pub fn applied(&self) -> Vec<ApplyRequest> {
        self.applied.lock().unwrap().clone()
    }

    pub fn applied_targets(&self) -> Vec<String> {
        self.applied().into_iter().map(|r| r.target).collect()
    }

    fn acknowledge(&self, request: ApplyRequest) -> Ack {
        let key = request.idempotency_key;
        let duplicate = !self.seen.lock().unwrap().insert(key);
        if !duplicate {
            self.applied.lock().unwrap().push(request);
        }
        Ack {
            idempotency_key: key,
            duplicate,
        }
    }
}

impl RemoteGateway for MockGateway {
    fn apply(
        &self,
        request: ApplyRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Ack>> + Send + '_>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(hook) = &self.hook {
                hook(&request);
            }
            if let Some(err) = self.validator.as_ref().and_then(|f| f(&request)) {
                return Err(err);
            }

            let reply = self.script.lock().unwrap().pop_front();
            match reply {
                None | Some(Reply::Ack) => Ok(self.acknowledge(request)),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Hang) => std::future::pending().await,
                Some(Reply::Wait(notify)) => {
                    notify.notified().await;
                    Ok(self.acknowledge(request))
                }
            }
        })
    }
}

/// Rejects products with a negative quantity, like the reference remote.
pub fn reject_negative_quantity(request: &ApplyRequest) -> Option<GatewayError> {
    let quantity = request.payload.get("quantity")?.as_i64()?;
    (quantity < 0).then(|| GatewayError::Validation("quantity must not be negative".into()))
}
