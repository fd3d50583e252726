// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Debug telemetry: the event broker, its SSE stream, and the node
//! override sent for a single-node debug run.

pub mod broker;
pub mod event;
pub mod stream;
pub mod task;

#[cfg(test)]
mod integration_tests;

pub use broker::{EventBroker, Received, Subscription};
pub use event::{DebugEvent, NodeStatus};
pub use stream::{data_frame, pump_events, EventStream, StreamFrame, HEARTBEAT_FRAME};
pub use task::{task_override, DebugMode, DebugRequest};
