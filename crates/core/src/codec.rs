// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence codec for the sync queue.
//!
//! The queue is stored as a single JSON document under [`QUEUE_KEY`]:
//!
//! ```json
//! { "schema_version": 2, "operations": [ ... ] }
//! ```
//!
//! Older layouts are upgraded on read, one version at a time. A document
//! written by a newer release is rejected instead of being misread.
//!
//! # Versions
//!
//! - **1**: a bare JSON array. Records carry `retries` instead of `attempts`,
//!   `created_at_ms` (epoch milliseconds) instead of `created_at`, and no
//!   `target`; the target is recovered from the payload.
//! - **2**: the current envelope.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::op::QueuedOperation;

/// Storage key under which the queue is persisted.
pub const QUEUE_KEY: &str = "sync_queue";

/// Schema version written by this release.
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Serialize)]
struct Envelope<'a> {
    schema_version: u32,
    operations: &'a [QueuedOperation],
}

/// Serializes the full queue into the current envelope.
pub fn encode(operations: &[QueuedOperation]) -> Result<Vec<u8>> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        operations,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Deserializes a persisted queue, upgrading older layouts.
///
/// Empty input decodes to an empty queue.
pub fn decode(bytes: &[u8]) -> Result<Vec<QueuedOperation>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let document: Value = serde_json::from_slice(bytes)?;
    let (version, mut operations) = split_envelope(document)?;

    if version == 0 || version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema(version));
    }

    for from in version..SCHEMA_VERSION {
        operations = upgrade(from, operations)?;
    }

    Ok(serde_json::from_value(operations)?)
}

fn split_envelope(document: Value) -> Result<(u32, Value)> {
    match document {
        Value::Array(_) => Ok((1, document)),
        Value::Object(mut map) => {
            let version = map
                .get("schema_version")
                .and_then(Value::as_u64)
                .ok_or_else(|| Error::CorruptedData("missing schema_version".to_string()))?;
            let version = u32::try_from(version).map_err(|_| {
                Error::CorruptedData(format!("schema_version out of range: {version}"))
            })?;
            let operations = map
                .remove("operations")
                .ok_or_else(|| Error::CorruptedData("missing operations".to_string()))?;
            Ok((version, operations))
        }
        other => Err(Error::CorruptedData(format!(
            "expected queue document, found {}",
            type_name(&other)
        ))),
    }
}

/// Upgrades the operations array from `from` to `from + 1`.
fn upgrade(from: u32, operations: Value) -> Result<Value> {
    match from {
        1 => upgrade_v1(operations),
        _ => Err(Error::UnsupportedSchema(from)),
    }
}

fn upgrade_v1(operations: Value) -> Result<Value> {
    let Value::Array(records) = operations else {
        return Err(Error::CorruptedData("v1 queue is not an array".to_string()));
    };

    records
        .into_iter()
        .map(|record| match record {
            Value::Object(map) => upgrade_v1_record(map).map(Value::Object),
            other => Err(Error::CorruptedData(format!(
                "v1 record is {}, expected object",
                type_name(&other)
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn upgrade_v1_record(mut map: Map<String, Value>) -> Result<Map<String, Value>> {
    if let Some(retries) = map.remove("retries") {
        map.insert("attempts".to_string(), retries);
    }

    if let Some(ms) = map.remove("created_at_ms") {
        let ms = ms
            .as_i64()
            .ok_or_else(|| Error::CorruptedData("v1 created_at_ms is not an integer".into()))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| Error::CorruptedData(format!("v1 created_at_ms out of range: {ms}")))?;
        map.insert(
            "created_at".to_string(),
            Value::String(created_at.to_rfc3339()),
        );
    }

    if !map.contains_key("target") {
        let target = map.get("payload").map(target_from_payload).unwrap_or_default();
        map.insert("target".to_string(), Value::String(target));
    }

    Ok(map)
}

/// v1 payloads were either the record key itself (deletes) or the full
/// record with an `id` field.
fn target_from_payload(payload: &Value) -> String {
    match payload {
        Value::String(key) => key.clone(),
        Value::Object(fields) => match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
