// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::{text, TestContext};
use serde_json::{json, Value};
use till_core::{Action, Entity};

#[tokio::test]
async fn empty_queue_is_idle() {
    let ctx = TestContext::new();
    let mut out = Vec::new();

    run(&ctx.controller, OutputFormat::Text, &mut out)
        .await
        .unwrap();

    assert!(text(&out).starts_with("Status: idle\n"));
}

#[tokio::test]
async fn queued_operations_in_json() {
    let ctx = TestContext::new();
    for target in ["s1", "s2"] {
        ctx.controller
            .enqueue(Entity::Sale, Action::Create, target, json!({ "id": target }))
            .await
            .unwrap();
    }
    let mut out = Vec::new();

    run(&ctx.controller, OutputFormat::Json, &mut out)
        .await
        .unwrap();

    let value: Value = serde_json::from_str(&text(&out)).unwrap();
    assert_eq!(value["status"]["state"], "queued");
    assert_eq!(value["status"]["count"], 2);
    assert_eq!(value["stats"]["pending"], 2);
    assert_eq!(value["stats"]["dead_lettered"], 0);
}
