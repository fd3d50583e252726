// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Building the one-node override a debug run hands to the task runner.

use crate::resource::NodeMap;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugMode {
    /// Run the node as written.
    #[default]
    Full,
    /// Recognize only: no successors, no action.
    RecognitionOnly,
}

/// A request to debug a single node, as sent by an editor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DebugRequest {
    /// `{id, ...fields}` record of the node.
    #[serde(default)]
    pub node: Value,
    #[serde(default)]
    pub debug_mode: DebugMode,
}

impl DebugRequest {
    pub fn task_override(&self) -> Option<(String, NodeMap)> {
        task_override(&self.node, self.debug_mode)
    }
}

/// Turn an `{id, ...fields}` record into the `{id: fields}` override map.
///
/// Returns the node id alongside the map. A record without a string or
/// numeric `id` yields `None`. In [`DebugMode::RecognitionOnly`] the node's
/// `next` and `on_error` are emptied and its action becomes `DoNothing`.
pub fn task_override(record: &Value, mode: DebugMode) -> Option<(String, NodeMap)> {
    let mut fields = record.as_object()?.clone();
    let id = match fields.shift_remove("id")? {
        Value::String(id) if !id.is_empty() => id,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if mode == DebugMode::RecognitionOnly {
        fields.insert("next".to_string(), json!([]));
        fields.insert("on_error".to_string(), json!([]));
        fields.insert("action".to_string(), json!("DoNothing"));
    }

    let mut task = NodeMap::new();
    task.insert(id.clone(), Value::Object(fields));
    Some((id, task))
}
