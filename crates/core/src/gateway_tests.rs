// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::Utc;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    timeout = { GatewayError::Timeout(Duration::from_secs(10)), FailureClass::Transient },
    network = { GatewayError::Network("connection refused".into()), FailureClass::Transient },
    rate_limited = { GatewayError::RateLimited("slow down".into()), FailureClass::Transient },
    server_error = { GatewayError::from_status(500, "boom"), FailureClass::Transient },
    unavailable = { GatewayError::from_status(503, "maintenance"), FailureClass::Transient },
    request_timeout = { GatewayError::from_status(408, "slow"), FailureClass::Transient },
    too_many = { GatewayError::from_status(429, "slow down"), FailureClass::Transient },
    validation = { GatewayError::Validation("quantity < 0".into()), FailureClass::Permanent },
    bad_request = { GatewayError::from_status(400, "bad"), FailureClass::Permanent },
    unprocessable = { GatewayError::from_status(422, "bad"), FailureClass::Permanent },
    conflict = { GatewayError::from_status(409, "deleted"), FailureClass::Permanent },
    not_found = { GatewayError::from_status(404, "gone"), FailureClass::Permanent },
    forbidden = { GatewayError::from_status(403, "no"), FailureClass::Permanent },
)]
fn gateway_error_classification(err: GatewayError, expected: FailureClass) {
    assert_eq!(err.class(), expected);
    assert_eq!(err.to_failure().class, expected);
}

#[parameterized(
    rate_limited = { 429, "rate limited" },
    conflict = { 409, "conflict" },
    validation = { 422, "validation failed" },
    other = { 418, "remote returned 418" },
)]
fn from_status_message(code: u16, prefix: &str) {
    let err = GatewayError::from_status(code, "details");
    let msg = err.to_string();
    assert!(msg.starts_with(prefix), "{msg}");
    assert!(msg.contains("details"));
}

#[test]
fn route_covers_every_entity_and_action() {
    let mut routes = Vec::new();
    for entity in Entity::ALL {
        for action in [Action::Create, Action::Update, Action::Delete] {
            routes.push(route(entity, action));
        }
    }
    routes.sort();
    routes.dedup();
    assert_eq!(routes.len(), 6);
    assert_eq!(route(Entity::Sale, Action::Create), "sales.create");
    assert_eq!(route(Entity::Product, Action::Update), "products.update");
}

#[test]
fn apply_request_carries_operation_id_as_key() {
    let op = QueuedOperation::new(
        Entity::Product,
        Action::Delete,
        "p7",
        json!("p7"),
        Utc::now(),
    );
    let request = ApplyRequest::from_operation(&op);

    assert_eq!(request.idempotency_key, op.id);
    assert_eq!(request.target, "p7");
    assert_eq!(request.route(), "products.delete");
}
