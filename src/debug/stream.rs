// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Server-sent-event framing of a subscription.
//!
//! A stream opens with the handshake event, then forwards every event its
//! subscription receives. When nothing arrives for one heartbeat interval
//! it emits a comment frame so idle connections stay open.

use crate::debug::broker::{EventBroker, Received, Subscription};
use crate::errors::StreamResult;
use crate::observability::messages::broker::StreamEnded;
use crate::observability::messages::StructuredLog;
use crate::traits::{BrokerEvent, FrameSink};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Comment frame sent after an idle heartbeat interval.
pub const HEARTBEAT_FRAME: &str = ": keep-alive\n\n";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame<E> {
    Event(E),
    Heartbeat,
}

/// `data: <json>\n\n`, with non-ASCII text left as-is.
pub fn data_frame<E: Serialize>(event: &E) -> StreamResult<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

impl<E: Serialize> StreamFrame<E> {
    pub fn to_sse(&self) -> StreamResult<String> {
        match self {
            StreamFrame::Event(event) => data_frame(event),
            StreamFrame::Heartbeat => Ok(HEARTBEAT_FRAME.to_string()),
        }
    }
}

pub struct EventStream<E> {
    subscription: Subscription<E>,
    heartbeat: Duration,
    greeting: Option<E>,
}

impl<E: BrokerEvent> EventStream<E> {
    /// Register with `broker` and queue the handshake as the first frame.
    pub fn open(broker: &EventBroker<E>, heartbeat: Duration) -> Self {
        Self {
            subscription: broker.register(),
            heartbeat,
            greeting: Some(E::handshake()),
        }
    }

    pub fn subscriber_id(&self) -> u64 {
        self.subscription.id()
    }

    /// The next frame, or `None` once the subscription has been closed.
    pub async fn next_frame(&mut self) -> Option<StreamFrame<E>> {
        if let Some(greeting) = self.greeting.take() {
            return Some(StreamFrame::Event(greeting));
        }
        match self.subscription.recv_timeout(self.heartbeat).await {
            Received::Event(event) => Some(StreamFrame::Event(event)),
            Received::Idle => Some(StreamFrame::Heartbeat),
            Received::Closed => None,
        }
    }
}

/// Drive a fresh subscription on `broker` into `sink`.
///
/// Runs until `cancel` fires, the subscription is closed, or the sink
/// fails; the first two end with `Ok`, a sink failure is returned. Closing
/// the subscription (see [`EventBroker::close`]) still delivers every event
/// queued before the close; cancelling abandons them. The subscription is
/// released on every exit. Returns the number of frames written.
pub async fn pump_events<E, S>(
    broker: &EventBroker<E>,
    sink: &mut S,
    heartbeat: Duration,
    cancel: CancellationToken,
) -> StreamResult<usize>
where
    E: BrokerEvent,
    S: FrameSink + ?Sized,
{
    let mut stream = EventStream::open(broker, heartbeat);
    let subscriber_id = stream.subscriber_id();
    let mut frames_sent = 0;

    let (result, reason) = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break (Ok(frames_sent), "cancelled"),
            frame = stream.next_frame() => frame,
        };
        let Some(frame) = frame else {
            break (Ok(frames_sent), "subscription closed");
        };

        let sent = match frame.to_sse() {
            Ok(text) => sink.send_frame(&text).await,
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            break (Err(err), "sink failed");
        }
        frames_sent += 1;
    };

    StreamEnded {
        subscriber_id,
        frames_sent,
        reason,
    }
    .log();
    result
}
