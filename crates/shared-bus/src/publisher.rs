//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{AuctionEvent, BusMessage, EventFilter};
use crate::subscriber::Subscription;
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_REDELIVERIES};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Trait for publishing events to the bus.
///
/// This is the interface services use to emit events for consumption by
/// other services.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a typed event.
    ///
    /// # Returns
    ///
    /// The number of subscriptions the event was queued for.
    async fn publish(&self, event: AuctionEvent) -> usize;

    /// Publish a raw message (already encoded).
    async fn publish_message(&self, message: BusMessage) -> usize;

    /// Get the total number of messages published.
    fn events_published(&self) -> u64;
}

/// One registered subscription as seen from the publishing side.
struct SubscriberSlot {
    filter: EventFilter,
    sender: mpsc::UnboundedSender<BusMessage>,
    backlog: Arc<AtomicUsize>,
}

/// Every live subscription, keyed by subscription id.
///
/// Subscriptions hold this weakly: once the bus is dropped their queues
/// close and `recv` drains to `None`.
pub(crate) struct SubscriberRegistry {
    slots: RwLock<HashMap<u64, SubscriberSlot>>,
    next_id: AtomicU64,
    backlog_warning: usize,
}

impl SubscriberRegistry {
    fn new(backlog_warning: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            backlog_warning: backlog_warning.max(1),
        }
    }

    fn register(
        &self,
        filter: EventFilter,
    ) -> (u64, mpsc::UnboundedReceiver<BusMessage>, Arc<AtomicUsize>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backlog = Arc::new(AtomicUsize::new(0));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.write().insert(
            id,
            SubscriberSlot {
                filter,
                sender,
                backlog: Arc::clone(&backlog),
            },
        );
        (id, receiver, backlog)
    }

    pub(crate) fn deregister(&self, id: u64) {
        self.slots.write().remove(&id);
    }

    fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Queue `message` for every subscription whose filter matches it.
    pub(crate) fn dispatch(&self, message: &BusMessage) -> usize {
        let slots = self.slots.read();
        let mut queued = 0;
        for (id, slot) in slots.iter() {
            if !slot.filter.matches(message) {
                continue;
            }
            if slot.sender.send(message.clone()).is_err() {
                // Receiver gone, the slot is removed when its Subscription drops.
                continue;
            }
            queued += 1;
            let backlog = slot.backlog.fetch_add(1, Ordering::Relaxed) + 1;
            if backlog == self.backlog_warning {
                warn!(
                    subscription = id,
                    backlog,
                    topic = %message.topic,
                    "Subscriber falling behind, messages are queued without bound"
                );
            }
        }
        queued
    }
}

/// In-memory implementation of the event bus.
///
/// Every subscription owns an unbounded queue. Publishing matches the
/// message against each subscription's filter and queues a copy for every
/// match, so a slow consumer never loses messages; past `capacity` queued
/// messages it is reported as falling behind. Each `Subscription` adds
/// at-least-once semantics on top: deliveries must be acknowledged, and
/// requeued ones come back flagged as redelivered until `max_redeliveries`
/// is exhausted, at which point they are dead-lettered.
///
/// Suitable for single-process operation; a broker-backed implementation
/// would provide the same traits.
pub struct InMemoryEventBus {
    /// Live subscriptions. Subscriptions only hold a weak handle so
    /// dropping the bus closes every subscription.
    registry: Arc<SubscriberRegistry>,

    /// Total messages published.
    events_published: AtomicU64,

    /// Per-subscriber backlog above which a warning is logged.
    capacity: usize,

    /// Requeues allowed per message before dead-lettering.
    max_redeliveries: u32,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, DEFAULT_MAX_REDELIVERIES)
    }

    /// Create a bus with explicit capacity and redelivery limit.
    #[must_use]
    pub fn with_limits(capacity: usize, max_redeliveries: u32) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new(capacity)),
            events_published: AtomicU64::new(0),
            capacity,
            max_redeliveries,
        }
    }

    /// Subscribe to messages matching a filter.
    ///
    /// Only messages published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let (id, receiver, backlog) = self.registry.register(filter.clone());

        debug!(
            subscription = id,
            topics = ?filter.topics,
            keys = ?filter.routing_keys,
            "New subscription created"
        );

        Subscription::new(
            id,
            receiver,
            backlog,
            filter,
            Arc::downgrade(&self.registry),
            self.max_redeliveries,
        )
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Per-subscriber backlog above which a warning is logged.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requeues allowed per message before dead-lettering.
    #[must_use]
    pub fn max_redeliveries(&self) -> u32 {
        self.max_redeliveries
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: AuctionEvent) -> usize {
        match event.to_message() {
            Ok(message) => self.publish_message(message).await,
            Err(e) => {
                warn!(topic = %event.topic(), error = %e, "Event dropped (encoding failed)");
                0
            }
        }
    }

    async fn publish_message(&self, message: BusMessage) -> usize {
        // Always increment counter (publish was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let receivers = self.registry.dispatch(&message);
        if receivers == 0 {
            debug!(topic = %message.topic, "Message published with no matching subscribers");
        } else {
            debug!(topic = %message.topic, receivers, "Message published");
        }
        receivers
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
