// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Node maps, node bodies and shape normalization.
//!
//! A pipeline file reaches the engine in one of two shapes: the canonical
//! mapping of node id to node body, or the editor's list of
//! `{id, data: {...}}` records (sometimes with a second `data` wrapper).
//! [`normalize_nodes`] turns either into a [`NodeMap`] once, at the
//! boundary, so nothing downstream branches on shape again.
//!
//! Node bodies stay open-ended JSON objects. [`NodeBody`] layers typed
//! accessors over the handful of fields the engine reads, applying the
//! string-or-list rule in one place.

use crate::config::consts::UNKNOWN_RECOGNITION;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Canonical file content: node id to node body, in file order.
pub type NodeMap = Map<String, Value>;

/// Forward-reference fields that link one node to others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceField {
    Next,
    Interrupt,
    OnError,
}

impl ReferenceField {
    /// Traversal order used by every graph walk.
    pub const ALL: [ReferenceField; 3] = [
        ReferenceField::Next,
        ReferenceField::Interrupt,
        ReferenceField::OnError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceField::Next => "next",
            ReferenceField::Interrupt => "interrupt",
            ReferenceField::OnError => "on_error",
        }
    }
}

impl fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert any JSON value into a canonical [`NodeMap`].
///
/// * An object is kept key for key; values that are not objects become `{}`.
/// * An array is read as `{id, data}` records. Records without a usable id
///   are dropped, a nested `data.data` is unwrapped, and a body that is not
///   an object becomes `{}`. A later record wins over an earlier one with
///   the same id.
/// * Anything else yields an empty map.
///
/// The function is pure and idempotent.
///
/// # Example
/// ```
/// use pipeline_atlas::resource::normalize_nodes;
/// use serde_json::json;
///
/// let listed = json!([
///     {"id": "Start", "data": {"next": "End"}},
///     {"id": "End", "data": {"data": {"recognition": "OCR"}}},
///     {"data": {"orphan": true}}
/// ]);
/// let nodes = normalize_nodes(&listed);
///
/// assert_eq!(nodes.len(), 2);
/// assert_eq!(nodes["Start"], json!({"next": "End"}));
/// assert_eq!(nodes["End"], json!({"recognition": "OCR"}));
/// assert_eq!(normalize_nodes(&serde_json::Value::Object(nodes.clone())), nodes);
/// ```
pub fn normalize_nodes(value: &Value) -> NodeMap {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(id, body)| (id.clone(), coerce_body(body)))
            .collect(),
        Value::Array(records) => records.iter().filter_map(record_to_node).collect(),
        _ => NodeMap::new(),
    }
}

fn coerce_body(body: &Value) -> Value {
    if body.is_object() {
        body.clone()
    } else {
        Value::Object(Map::new())
    }
}

fn record_to_node(record: &Value) -> Option<(String, Value)> {
    let record = record.as_object()?;
    let id = match record.get("id")? {
        Value::String(id) if !id.is_empty() => id.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let Some(mut body) = record.get("data") else {
        return Some((id, Value::Object(Map::new())));
    };
    if let Some(inner) = body.as_object().and_then(|data| data.get("data")) {
        body = inner;
    }

    Some((id, coerce_body(body)))
}

/// Read a string-or-list field as a list of strings.
///
/// Absent fields and non-string list items contribute nothing.
pub fn string_list(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Typed, read-only view over one node body.
#[derive(Debug, Clone, Copy)]
pub struct NodeBody<'a> {
    body: &'a Value,
}

impl<'a> NodeBody<'a> {
    pub fn new(body: &'a Value) -> Self {
        Self { body }
    }

    fn field(&self, name: &str) -> Option<&'a Value> {
        self.body.as_object().and_then(|map| map.get(name))
    }

    /// Targets of one forward-reference field.
    pub fn references(&self, field: ReferenceField) -> Vec<&'a str> {
        string_list(self.field(field.as_str()))
    }

    /// Targets of every forward-reference field, in traversal order.
    pub fn all_references(&self) -> impl Iterator<Item = &'a str> + 'a {
        let body = *self;
        ReferenceField::ALL
            .into_iter()
            .flat_map(move |field| body.references(field))
    }

    /// Whether `field` names `target`, as a string or a list member.
    pub fn references_target(&self, field: ReferenceField, target: &str) -> bool {
        self.references(field).contains(&target)
    }

    /// Relative image paths listed under `template`.
    pub fn templates(&self) -> Vec<&'a str> {
        string_list(self.field("template"))
    }

    /// The body's own `id` if it has one, else the storage key.
    pub fn display_id(&self, storage_id: &str) -> String {
        match self.field("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => storage_id.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// The `recognition` tag, defaulting to `"Unknown"`.
    pub fn recognition(&self) -> String {
        match self.field("recognition") {
            Some(Value::String(tag)) => tag.clone(),
            Some(Value::Null) | None => UNKNOWN_RECOGNITION.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Replace `old` with `new` inside one reference field of a node body.
///
/// A string field stays a string and a list stays a list. Returns whether
/// anything changed.
pub fn replace_reference(body: &mut Value, field: ReferenceField, old: &str, new: &str) -> bool {
    let Some(value) = body.as_object_mut().and_then(|map| map.get_mut(field.as_str())) else {
        return false;
    };

    match value {
        Value::String(target) if *target == old => {
            *target = new.to_string();
            true
        }
        Value::Array(items) => {
            let mut changed = false;
            for item in items.iter_mut() {
                if item.as_str() == Some(old) {
                    *item = Value::String(new.to_string());
                    changed = true;
                }
            }
            changed
        }
        _ => false,
    }
}
