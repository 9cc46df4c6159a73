// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

//! Test infrastructure for command testing without a remote or disk queue.
//!
//! `TestContext` wires a controller over an in-memory store to a stub
//! gateway that acknowledges everything except negative quantities.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use till_core::{
    Ack, ApplyRequest, Connectivity, ConnectivitySignal, EngineOptions, GatewayError,
    GatewayResult, MemoryStore, OperationQueue, RemoteGateway, SyncController, SystemClock,
};

#[derive(Default)]
pub struct StubGateway {
    pub applied: Mutex<Vec<ApplyRequest>>,
}

impl RemoteGateway for StubGateway {
    fn apply(
        &self,
        request: ApplyRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<Ack>> + Send + '_>> {
        Box::pin(async move {
            let negative = request
                .payload
                .get("quantity")
                .and_then(|q| q.as_i64())
                .is_some_and(|q| q < 0);
            if negative {
                return Err(GatewayError::Validation(
                    "quantity must not be negative".into(),
                ));
            }
            let key = request.idempotency_key;
            self.applied.lock().unwrap().push(request);
            Ok(Ack {
                idempotency_key: key,
                duplicate: false,
            })
        })
    }
}

/// Test context providing an offline controller over an in-memory queue.
pub struct TestContext {
    pub controller: SyncController,
    pub signal: ConnectivitySignal,
    pub gateway: Arc<StubGateway>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let queue = OperationQueue::open(MemoryStore::new(), chrono::Utc::now()).unwrap();
        let signal = ConnectivitySignal::new(Connectivity::Offline);
        let gateway = Arc::new(StubGateway::default());
        let controller = SyncController::new(
            queue,
            gateway.clone(),
            Arc::new(signal.clone()),
            Arc::new(SystemClock),
            EngineOptions::default(),
        );
        TestContext {
            controller,
            signal,
            gateway,
        }
    }

    pub fn applied(&self) -> usize {
        self.gateway.applied.lock().unwrap().len()
    }
}

/// Captured command output as a string.
pub fn text(buf: &[u8]) -> String {
    String::from_utf8(buf.to_vec()).unwrap()
}
