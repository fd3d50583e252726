// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for debug broker subscriber events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A subscriber registered with the broker.
///
/// # Log Level
/// `debug!` - Diagnostic information
pub struct SubscriberRegistered {
    pub subscriber_id: u64,
    pub active_subscribers: usize,
}

impl Display for SubscriberRegistered {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Debug subscriber {} registered ({} active)",
            self.subscriber_id, self.active_subscribers
        )
    }
}

impl StructuredLog for SubscriberRegistered {
    fn log(&self) {
        tracing::debug!(
            subscriber_id = self.subscriber_id,
            active_subscribers = self.active_subscribers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "subscriber_registered",
            span_name = name,
            subscriber_id = self.subscriber_id,
        )
    }
}

/// A subscriber left the broker.
///
/// # Log Level
/// `debug!` - Diagnostic information
pub struct SubscriberUnregistered {
    pub subscriber_id: u64,
    pub active_subscribers: usize,
}

impl Display for SubscriberUnregistered {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Debug subscriber {} unregistered ({} active)",
            self.subscriber_id, self.active_subscribers
        )
    }
}

impl StructuredLog for SubscriberUnregistered {
    fn log(&self) {
        tracing::debug!(
            subscriber_id = self.subscriber_id,
            active_subscribers = self.active_subscribers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "subscriber_unregistered",
            span_name = name,
            subscriber_id = self.subscriber_id,
        )
    }
}

/// A bounded inbox was full and an event was dropped for that subscriber.
///
/// # Log Level
/// `warn!` - Data loss for one slow subscriber
pub struct EventDropped {
    pub subscriber_id: u64,
    pub capacity: usize,
}

impl Display for EventDropped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropped debug event for subscriber {}: inbox full (capacity {})",
            self.subscriber_id, self.capacity
        )
    }
}

impl StructuredLog for EventDropped {
    fn log(&self) {
        tracing::warn!(
            subscriber_id = self.subscriber_id,
            capacity = self.capacity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "event_dropped",
            span_name = name,
            subscriber_id = self.subscriber_id,
            capacity = self.capacity,
        )
    }
}

/// A subscriber's stream loop finished and released its inbox.
///
/// # Log Level
/// `debug!` - Diagnostic information
pub struct StreamEnded<'a> {
    pub subscriber_id: u64,
    pub frames_sent: usize,
    pub reason: &'a str,
}

impl Display for StreamEnded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Debug stream for subscriber {} ended after {} frames: {}",
            self.subscriber_id, self.frames_sent, self.reason
        )
    }
}

impl StructuredLog for StreamEnded<'_> {
    fn log(&self) {
        tracing::debug!(
            subscriber_id = self.subscriber_id,
            frames_sent = self.frames_sent,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stream_ended",
            span_name = name,
            subscriber_id = self.subscriber_id,
            frames_sent = self.frames_sent,
        )
    }
}
