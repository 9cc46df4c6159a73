// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::{text, TestContext};
use till_core::OpStatus;
use yare::parameterized;

#[tokio::test]
async fn enqueue_prints_id_and_persists() {
    let ctx = TestContext::new();
    let mut out = Vec::new();

    run(
        &ctx.controller,
        "sale",
        "create",
        "s1",
        Some(r#"{"id":"s1","total":1500}"#),
        OutputFormat::Text,
        &mut out,
    )
    .await
    .unwrap();

    let id: OpId = text(&out).trim().parse().unwrap();
    let ops = ctx.controller.snapshot().await;
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].id, id);
    assert_eq!(ops[0].status, OpStatus::Pending);
    assert_eq!(ops[0].payload["total"], 1500);
    // Offline: nothing delivered.
    assert_eq!(ctx.applied(), 0);
}

#[tokio::test]
async fn enqueue_json_output() {
    let ctx = TestContext::new();
    let mut out = Vec::new();

    run(
        &ctx.controller,
        "products",
        "delete",
        "p1",
        None,
        OutputFormat::Json,
        &mut out,
    )
    .await
    .unwrap();

    let value: Value = serde_json::from_str(&text(&out)).unwrap();
    assert_eq!(value["entity"], "product");
    assert_eq!(value["action"], "delete");
    assert_eq!(value["target"], "p1");
    assert_eq!(ctx.controller.snapshot().await[0].payload, json!("p1"));
}

#[parameterized(
    create = { Action::Create, json!({ "id": "p1" }) },
    update = { Action::Update, json!({ "id": "p1" }) },
    delete = { Action::Delete, json!("p1") },
)]
fn default_payload_by_action(action: Action, expected: Value) {
    assert_eq!(default_payload(action, "p1"), expected);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_queueing() {
    let ctx = TestContext::new();
    let mut out = Vec::new();

    let err = run(&ctx.controller, "invoice", "create", "i1", None, OutputFormat::Text, &mut out)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("valid entities are"));

    let err = run(
        &ctx.controller,
        "sale",
        "create",
        "s1",
        Some("{not json"),
        OutputFormat::Text,
        &mut out,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidPayload(_)));

    assert!(ctx.controller.snapshot().await.is_empty());
}
