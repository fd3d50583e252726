// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed debug telemetry events.
//!
//! Every event serializes as a JSON object tagged by `type`, which is the
//! envelope the debug stream clients expect.

use crate::traits::BrokerEvent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Progress of one node-level step reported by the task runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Starting,
    Succeeded,
    Failed,
}

/// # Example
/// ```
/// use pipeline_atlas::debug::{DebugEvent, NodeStatus};
///
/// let event = DebugEvent::NodeRecognition {
///     task_id: 3,
///     name: "StartButton".to_string(),
///     reco_id: 41,
///     status: NodeStatus::Succeeded,
/// };
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["type"], "node_recognition");
/// assert_eq!(json["status"], "succeeded");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebugEvent {
    /// Handshake, sent once at the start of every subscription.
    Hello {
        /// Milliseconds since the Unix epoch.
        timestamp: u64,
    },
    /// The runner is about to try the candidates in `next_list`.
    NodeNextList {
        task_id: i64,
        name: String,
        next_list: Vec<String>,
        status: NodeStatus,
    },
    /// A recognition attempt for node `name`.
    NodeRecognition {
        task_id: i64,
        name: String,
        reco_id: i64,
        status: NodeStatus,
    },
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

impl DebugEvent {
    pub fn hello() -> Self {
        DebugEvent::Hello {
            timestamp: now_millis(),
        }
    }

    /// The `type` tag this event serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            DebugEvent::Hello { .. } => "hello",
            DebugEvent::NodeNextList { .. } => "node_next_list",
            DebugEvent::NodeRecognition { .. } => "node_recognition",
        }
    }
}

impl BrokerEvent for DebugEvent {
    fn handshake() -> Self {
        DebugEvent::hello()
    }
}

/// Free-form records from the task runner. `null` and `{}` are empty.
impl BrokerEvent for Value {
    fn handshake() -> Self {
        json!({"type": "hello", "timestamp": now_millis()})
    }

    fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_emptiness() {
        assert!(BrokerEvent::is_empty(&Value::Null));
        assert!(BrokerEvent::is_empty(&json!({})));
        assert!(!BrokerEvent::is_empty(&json!({"type": "x"})));
        assert!(!BrokerEvent::is_empty(&json!([])));
    }

    #[test]
    fn test_value_handshake_matches_typed_hello() {
        let hello = <Value as BrokerEvent>::handshake();
        assert_eq!(hello["type"], "hello");
        assert!(hello["timestamp"].as_u64().is_some());
    }

    #[test]
    fn test_next_list_envelope() {
        let event = DebugEvent::NodeNextList {
            task_id: 7,
            name: "Home".to_string(),
            next_list: vec!["A".to_string(), "B".to_string()],
            status: NodeStatus::Starting,
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "node_next_list",
                "task_id": 7,
                "name": "Home",
                "next_list": ["A", "B"],
                "status": "starting"
            })
        );
        assert_eq!(event.kind(), "node_next_list");
    }

    #[test]
    fn test_parse_recognition_event() {
        let event: DebugEvent = serde_json::from_value(json!({
            "type": "node_recognition",
            "task_id": 1,
            "name": "Battle",
            "reco_id": 99,
            "status": "failed"
        }))
        .unwrap();

        assert_eq!(
            event,
            DebugEvent::NodeRecognition {
                task_id: 1,
                name: "Battle".to_string(),
                reco_id: 99,
                status: NodeStatus::Failed,
            }
        );
    }

    #[test]
    fn test_hello_has_current_timestamp() {
        let DebugEvent::Hello { timestamp } = DebugEvent::hello() else {
            panic!("expected hello");
        };
        assert!(timestamp > 1_600_000_000_000);
        assert!(!BrokerEvent::is_empty(&DebugEvent::hello()));
    }
}
