//! # Event Subscriber
//!
//! Defines the consuming side of the event bus with at-least-once delivery.
//!
//! Every message handed out by [`Subscription::recv`] is wrapped in a
//! [`Delivery`] that must be settled:
//!
//! - `ack()`: processed, forget it;
//! - `requeue()`: not processed, hand it out again (flagged `redelivered`);
//! - dropped unsettled: requeued, as after a consumer crash.
//!
//! A message requeued more than `max_redeliveries` times is moved to the
//! dead letter topic instead.

use crate::events::{BusMessage, EventFilter, EventTopic};
use crate::publisher::SubscriberRegistry;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// Trait for subscribing to messages from the bus.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to messages matching a filter.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

#[async_trait]
impl EventSubscriber for crate::publisher::InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        crate::publisher::InMemoryEventBus::subscribe(self, filter)
    }
}

/// Counters for one subscription.
#[derive(Debug, Default)]
struct DeliveryCounters {
    delivered: AtomicU64,
    acked: AtomicU64,
    requeued: AtomicU64,
    dead_lettered: AtomicU64,
}

/// Point-in-time copy of a subscription's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Deliveries handed out, including redeliveries.
    pub delivered: u64,
    /// Deliveries acknowledged.
    pub acked: u64,
    /// Deliveries put back for redelivery.
    pub requeued: u64,
    /// Messages moved to the dead letter topic.
    pub dead_lettered: u64,
}

/// A message waiting to be handed out again.
struct Pending {
    message: BusMessage,
    attempt: u32,
}

/// Requeued messages of one subscription.
#[derive(Default)]
struct RedeliveryQueue {
    pending: Mutex<VecDeque<Pending>>,
    notify: Notify,
}

impl RedeliveryQueue {
    fn push(&self, pending: Pending) {
        self.pending.lock().push_back(pending);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Pending> {
        self.pending.lock().pop_front()
    }
}

/// Shared settlement context handed to each delivery.
#[derive(Clone)]
struct Settler {
    queue: Arc<RedeliveryQueue>,
    registry: Weak<SubscriberRegistry>,
    max_redeliveries: u32,
    counters: Arc<DeliveryCounters>,
}

impl Settler {
    fn requeue(&self, message: BusMessage, attempt: u32) {
        if attempt >= self.max_redeliveries {
            self.dead_letter(message, attempt);
            return;
        }
        self.counters.requeued.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Pending {
            message,
            attempt: attempt + 1,
        });
    }

    fn dead_letter(&self, message: BusMessage, attempt: u32) {
        self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
        warn!(
            message_id = %message.id,
            topic = %message.topic,
            attempts = attempt + 1,
            "Redeliveries exhausted, moving message to dead letter queue"
        );

        let Some(registry) = self.registry.upgrade() else {
            warn!(message_id = %message.id, "Bus closed, dead letter dropped");
            return;
        };
        let origin = message.topic.name().to_string();
        let dead = BusMessage {
            id: message.id,
            topic: EventTopic::DeadLetterQueue,
            routing_key: Some(origin),
            body: message.body,
        };
        if registry.dispatch(&dead) == 0 {
            debug!("No dead letter subscribers");
        }
    }
}

/// A message handed to a consumer, awaiting acknowledgement.
pub struct Delivery {
    message: BusMessage,
    delivery_tag: u64,
    attempt: u32,
    settled: bool,
    settler: Settler,
}

impl Delivery {
    /// The delivered message.
    #[must_use]
    pub fn message(&self) -> &BusMessage {
        &self.message
    }

    /// Per-subscription sequence number of this hand-out.
    #[must_use]
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// How many times this message was requeued before this hand-out.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether this message was handed out before.
    #[must_use]
    pub fn redelivered(&self) -> bool {
        self.attempt > 0
    }

    /// Acknowledge successful processing.
    pub fn ack(mut self) {
        self.settled = true;
        self.settler.counters.acked.fetch_add(1, Ordering::Relaxed);
    }

    /// Reject for now; the message will be redelivered (or dead-lettered).
    pub fn requeue(mut self) {
        self.settled = true;
        self.settler.requeue(self.message.clone(), self.attempt);
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.settled {
            debug!(
                message_id = %self.message.id,
                tag = self.delivery_tag,
                "Delivery dropped unsettled, requeueing"
            );
            self.settler.requeue(self.message.clone(), self.attempt);
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .field("delivery_tag", &self.delivery_tag)
            .field("attempt", &self.attempt)
            .finish()
    }
}

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription is automatically cleaned up. Requeued
/// messages are handed out before new ones.
pub struct Subscription {
    /// Id of this subscription in the bus registry.
    id: u64,

    /// Queue of messages that matched the filter at publish time.
    receiver: mpsc::UnboundedReceiver<BusMessage>,

    /// Messages queued but not yet taken, shared with the publisher.
    backlog: Arc<AtomicUsize>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Settlement context shared with outstanding deliveries.
    settler: Settler,

    /// Next delivery tag.
    next_tag: u64,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(
        id: u64,
        receiver: mpsc::UnboundedReceiver<BusMessage>,
        backlog: Arc<AtomicUsize>,
        filter: EventFilter,
        registry: Weak<SubscriberRegistry>,
        max_redeliveries: u32,
    ) -> Self {
        Self {
            id,
            receiver,
            backlog,
            filter,
            settler: Settler {
                queue: Arc::new(RedeliveryQueue::default()),
                registry,
                max_redeliveries,
                counters: Arc::new(DeliveryCounters::default()),
            },
            next_tag: 0,
        }
    }

    fn take(&mut self, message: BusMessage) -> Delivery {
        self.backlog.fetch_sub(1, Ordering::Relaxed);
        self.deliver(message, 0)
    }

    fn deliver(&mut self, message: BusMessage, attempt: u32) -> Delivery {
        self.next_tag += 1;
        self.settler
            .counters
            .delivered
            .fetch_add(1, Ordering::Relaxed);
        Delivery {
            message,
            delivery_tag: self.next_tag,
            attempt,
            settled: false,
            settler: self.settler.clone(),
        }
    }

    /// Receive the next message that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The next matching message (or a redelivery)
    /// - `None` - The bus was dropped and nothing is left to redeliver
    pub async fn recv(&mut self) -> Option<Delivery> {
        let queue = Arc::clone(&self.settler.queue);
        loop {
            if let Some(pending) = queue.pop() {
                return Some(self.deliver(pending.message, pending.attempt));
            }

            tokio::select! {
                biased;
                _ = queue.notify.notified() => continue,
                message = self.receiver.recv() => match message {
                    Some(message) => return Some(self.take(message)),
                    None => {
                        let pending = queue.pop()?;
                        return Some(self.deliver(pending.message, pending.attempt));
                    }
                },
            }
        }
    }

    /// Try to receive the next message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(delivery))` - A message was available and matched
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(SubscriptionError::Closed)` - The bus was dropped
    pub fn try_recv(&mut self) -> Result<Option<Delivery>, SubscriptionError> {
        if let Some(pending) = self.settler.queue.pop() {
            return Ok(Some(self.deliver(pending.message, pending.attempt)));
        }

        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(self.take(message))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Messages queued for this subscription and not yet received.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Relaxed)
    }

    /// Snapshot of this subscription's delivery counters.
    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        let counters = &self.settler.counters;
        DeliveryStats {
            delivered: counters.delivered.load(Ordering::Relaxed),
            acked: counters.acked.load(Ordering::Relaxed),
            requeued: counters.requeued.load(Ordering::Relaxed),
            dead_lettered: counters.dead_lettered.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.settler.registry.upgrade() {
            registry.deregister(self.id);
        }
        debug!(subscription = self.id, "Subscription dropped");
    }
}
