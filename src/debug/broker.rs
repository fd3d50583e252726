// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fan-out of debug events to independent subscribers.
//!
//! Each subscriber owns one inbox (an mpsc channel). The registry of
//! inboxes sits behind a single lock; `register`, `unregister` and
//! `publish` all take it, so a publish always sees a consistent set of
//! subscribers. Publishing never waits on an inbox: unbounded inboxes
//! always accept, bounded ones drop the event for that subscriber alone
//! when full.
//!
//! A [`Subscription`] unregisters itself on drop, so a subscriber loop
//! releases its inbox on every exit path.

use crate::observability::messages::broker::{EventDropped, SubscriberRegistered, SubscriberUnregistered};
use crate::observability::messages::StructuredLog;
use crate::traits::BrokerEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

enum Inbox<E> {
    Bounded { sender: mpsc::Sender<E>, capacity: usize },
    Unbounded(mpsc::UnboundedSender<E>),
}

enum Outbox<E> {
    Bounded(mpsc::Receiver<E>),
    Unbounded(mpsc::UnboundedReceiver<E>),
}

struct Registry<E> {
    next_id: u64,
    inboxes: HashMap<u64, Inbox<E>>,
}

struct Shared<E> {
    capacity: Option<usize>,
    registry: Mutex<Registry<E>>,
}

impl<E> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, Registry<E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) -> bool {
        let mut registry = self.lock();
        let removed = registry.inboxes.remove(&id).is_some();
        if removed {
            SubscriberUnregistered {
                subscriber_id: id,
                active_subscribers: registry.inboxes.len(),
            }
            .log();
        }
        removed
    }
}

/// Multi-producer, multi-subscriber event fan-out.
///
/// Cloning yields another handle to the same broker.
///
/// # Example
/// ```
/// use pipeline_atlas::debug::EventBroker;
/// use serde_json::json;
///
/// let broker = EventBroker::<serde_json::Value>::unbounded();
/// let mut first = broker.register();
/// let mut second = broker.register();
///
/// assert_eq!(broker.publish(&json!({"type": "node_next_list"})), 2);
/// assert!(first.try_recv().is_some());
/// assert!(second.try_recv().is_some());
/// ```
pub struct EventBroker<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for EventBroker<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: BrokerEvent> Default for EventBroker<E> {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// What a timed receive produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Received<E> {
    Event(E),
    /// Nothing arrived within the timeout.
    Idle,
    /// The subscription was unregistered and its inbox is drained.
    Closed,
}

impl<E: BrokerEvent> EventBroker<E> {
    /// Every subscriber gets an unbounded inbox.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Every subscriber gets an inbox holding at most `capacity` events.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    /// `None` means unbounded. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity: capacity.map(|c| c.max(1)),
                registry: Mutex::new(Registry {
                    next_id: 1,
                    inboxes: HashMap::new(),
                }),
            }),
        }
    }

    /// Open a new, empty inbox.
    pub fn register(&self) -> Subscription<E> {
        let mut registry = self.shared.lock();
        let id = registry.next_id;
        registry.next_id += 1;

        let (inbox, outbox) = match self.shared.capacity {
            Some(capacity) => {
                let (sender, receiver) = mpsc::channel(capacity);
                (Inbox::Bounded { sender, capacity }, Outbox::Bounded(receiver))
            }
            None => {
                let (sender, receiver) = mpsc::unbounded_channel();
                (Inbox::Unbounded(sender), Outbox::Unbounded(receiver))
            }
        };
        registry.inboxes.insert(id, inbox);

        SubscriberRegistered {
            subscriber_id: id,
            active_subscribers: registry.inboxes.len(),
        }
        .log();

        Subscription {
            id,
            outbox,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Remove a subscriber. Returns whether it was still registered.
    ///
    /// Events already queued stay readable; after them the subscription
    /// reports [`Received::Closed`].
    pub fn unregister(&self, id: u64) -> bool {
        self.shared.remove(id)
    }

    /// Queue a copy of `event` for every registered subscriber.
    ///
    /// Returns how many inboxes accepted it. Empty events are ignored.
    pub fn publish(&self, event: &E) -> usize {
        if event.is_empty() {
            return 0;
        }

        let registry = self.shared.lock();
        let mut delivered = 0;
        for (&id, inbox) in &registry.inboxes {
            let accepted = match inbox {
                Inbox::Unbounded(sender) => sender.send(event.clone()).is_ok(),
                Inbox::Bounded { sender, capacity } => match sender.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        EventDropped {
                            subscriber_id: id,
                            capacity: *capacity,
                        }
                        .log();
                        false
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
            };
            if accepted {
                delivered += 1;
            }
        }
        delivered
    }

    /// Unregister every subscriber, e.g. once the publisher is done.
    ///
    /// Each subscription still yields what was queued before the close,
    /// then [`Received::Closed`]. Returns how many were registered.
    pub fn close(&self) -> usize {
        let mut registry = self.shared.lock();
        let closed: Vec<u64> = registry.inboxes.drain().map(|(id, _)| id).collect();
        for &id in &closed {
            SubscriberUnregistered {
                subscriber_id: id,
                active_subscribers: 0,
            }
            .log();
        }
        closed.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().inboxes.len()
    }
}

/// One subscriber's inbox. Dropping it unregisters the subscriber.
pub struct Subscription<E> {
    id: u64,
    outbox: Outbox<E>,
    shared: Arc<Shared<E>>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event; `None` once unregistered and drained.
    pub async fn recv(&mut self) -> Option<E> {
        match &mut self.outbox {
            Outbox::Bounded(receiver) => receiver.recv().await,
            Outbox::Unbounded(receiver) => receiver.recv().await,
        }
    }

    /// Wait at most `timeout` for the next event.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Received<E> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(event)) => Received::Event(event),
            Ok(None) => Received::Closed,
            Err(_) => Received::Idle,
        }
    }

    /// Take a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        match &mut self.outbox {
            Outbox::Bounded(receiver) => receiver.try_recv().ok(),
            Outbox::Unbounded(receiver) => receiver.try_recv().ok(),
        }
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.shared.remove(self.id);
    }
}
