//! # Arbitration Consumers
//!
//! One consumer per inbound topic. Each decodes deliveries, hands the
//! command to the sharded dispatcher and settles the delivery once the
//! worker reports a disposition, without blocking on it.
//!
//! ## Flow
//!
//! ```text
//! Subscription(topic) ─→ decode ─┬─ malformed ─→ warn, ack
//!                                └─ command ──→ dispatcher ─→ oneshot
//!                                                               │
//!                         settle task ←─────────────────────────┘
//!                         Ack → ack()   Requeue → requeue()
//! ```

use std::sync::Arc;

use auction_arbiter::{decode_command, Disposition, OutcomeReceiver, ShardedDispatcher};
use shared_bus::{Delivery, EventTopic, Subscription};
use tracing::{debug, error, info, warn};

/// Consumer of one inbound arbitration topic.
pub struct ArbitrationConsumer {
    topic: EventTopic,
    subscription: Subscription,
    dispatcher: Arc<ShardedDispatcher>,
}

impl ArbitrationConsumer {
    /// Create a consumer over an existing subscription.
    pub fn new(
        topic: EventTopic,
        subscription: Subscription,
        dispatcher: Arc<ShardedDispatcher>,
    ) -> Self {
        Self {
            topic,
            subscription,
            dispatcher,
        }
    }

    /// Run until the bus closes.
    pub async fn run(mut self) {
        info!(topic = %self.topic, "[arbiter] Consumer started");

        while let Some(delivery) = self.subscription.recv().await {
            self.handle(delivery).await;
        }

        info!(topic = %self.topic, "[arbiter] Consumer stopped, bus closed");
    }

    async fn handle(&self, delivery: Delivery) {
        let message = delivery.message();
        let command = match decode_command(message) {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    topic = %self.topic,
                    message_id = %message.id,
                    error = %e,
                    "[arbiter] Dropping malformed message"
                );
                delivery.ack();
                return;
            }
        };

        if delivery.redelivered() {
            debug!(
                auction_id = %command.auction_id(),
                attempt = delivery.attempt(),
                "[arbiter] Processing redelivery"
            );
        }

        match self.dispatcher.dispatch(command).await {
            Ok(outcome) => {
                tokio::spawn(settle(delivery, outcome));
            }
            Err(e) => {
                error!(topic = %self.topic, error = %e, "[arbiter] Dispatch failed");
                delivery.requeue();
            }
        }
    }
}

async fn settle(delivery: Delivery, outcome: OutcomeReceiver) {
    match outcome.await {
        Ok(outcome) => match outcome.disposition() {
            Disposition::Ack => delivery.ack(),
            Disposition::Requeue => delivery.requeue(),
        },
        Err(_) => {
            warn!(message_id = %delivery.message().id, "[arbiter] Worker dropped the command");
            delivery.requeue();
        }
    }
}
