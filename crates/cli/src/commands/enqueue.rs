// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use serde::Serialize;
use serde_json::{json, Value};
use till_core::{Action, Entity, OpId, SyncController};

use crate::cli::OutputFormat;
use crate::error::{Error, Result};

use super::write_json;

#[derive(Serialize)]
struct EnqueuedJson<'a> {
    id: OpId,
    entity: Entity,
    action: Action,
    target: &'a str,
}

/// Payload used when none is given: the record's id, or the bare key for
/// deletes.
fn default_payload(action: Action, target: &str) -> Value {
    match action {
        Action::Delete => json!(target),
        Action::Create | Action::Update => json!({ "id": target }),
    }
}

fn parse_payload(action: Action, target: &str, payload: Option<&str>) -> Result<Value> {
    match payload {
        Some(raw) => serde_json::from_str(raw).map_err(|e| Error::InvalidPayload(e.to_string())),
        None => Ok(default_payload(action, target)),
    }
}

pub async fn run(
    controller: &SyncController,
    entity: &str,
    action: &str,
    target: &str,
    payload: Option<&str>,
    output: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let entity: Entity = entity.parse()?;
    let action: Action = action.parse()?;
    let payload = parse_payload(action, target, payload)?;

    let id = controller.enqueue(entity, action, target, payload).await?;

    match output {
        OutputFormat::Text => writeln!(out, "{}", id)?,
        OutputFormat::Json => write_json(
            out,
            &EnqueuedJson {
                id,
                entity,
                action,
                target,
            },
        )?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
