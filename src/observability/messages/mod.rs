// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `resource` - resource index, pipeline file store and image assets
//! * `broker` - debug event broker subscribers and delivery

use tracing::Span;

pub mod broker;
pub mod resource;

/// A message that knows its own log level and structured fields.
///
/// `Display` supplies the human-readable text; `log` emits it together
/// with machine-readable fields at the level documented on the type.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Build a span carrying the same fields.
    fn span(&self, name: &str) -> Span;
}
