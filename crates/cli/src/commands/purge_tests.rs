// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::{text, TestContext};
use serde_json::json;
use till_core::{Action, Connectivity, Entity, SyncStatus};

async fn dead_letter_one(ctx: &TestContext) {
    ctx.controller
        .enqueue(Entity::Product, Action::Update, "p1", json!({ "id": "p1", "quantity": -1 }))
        .await
        .unwrap();
    ctx.signal.set(Connectivity::Online);
    ctx.controller.retry_sync().await.unwrap();
    assert_eq!(ctx.controller.status().await, SyncStatus::Error);
}

#[tokio::test]
async fn purge_all_dead_letters() {
    let ctx = TestContext::new();
    dead_letter_one(&ctx).await;
    let mut out = Vec::new();

    run(&ctx.controller, None, &mut out).await.unwrap();

    assert_eq!(text(&out), "purged 1 dead-lettered operation(s)\n");
    assert_eq!(ctx.controller.status().await, SyncStatus::Idle);
}

#[tokio::test]
async fn purge_keeps_recent_dead_letters() {
    let ctx = TestContext::new();
    dead_letter_one(&ctx).await;
    let mut out = Vec::new();

    run(&ctx.controller, Some(3600), &mut out).await.unwrap();

    assert_eq!(text(&out), "purged 0 dead-lettered operation(s)\n");
    assert_eq!(ctx.controller.dead_letters().await.len(), 1);
}
