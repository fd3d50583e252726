// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic line the crate emits is described by a message struct
//! with a `Display` implementation, so log text lives in one place instead
//! of being scattered through the call sites as format strings.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::resource` - index construction, file store and asset events
//! * `messages::broker` - debug subscriber lifecycle and delivery events
//!
//! # Usage
//!
//! ```rust
//! use pipeline_atlas::observability::messages::StructuredLog;
//! use pipeline_atlas::observability::messages::resource::PipelineFileSaved;
//! use std::path::Path;
//!
//! let msg = PipelineFileSaved {
//!     path: Path::new("/res/pipeline/main.json"),
//!     node_count: 12,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
