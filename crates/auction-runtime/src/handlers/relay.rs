//! # Notification Relay
//!
//! Republishes arbitration outcomes on the per-auction notification topic,
//! keyed by auction id, so that clients follow only the auctions they
//! bid on.

use std::sync::Arc;

use chrono::Utc;
use shared_bus::{AuctionEvent, EventFilter, EventPublisher, EventTopic, Subscription};
use shared_types::ipc::{NotificationKind, NotificationPayload};
use tracing::{info, warn};

/// Topics the relay consumes.
pub const RELAY_TOPICS: [EventTopic; 2] = [EventTopic::BidValidated, EventTopic::AuctionWinner];

/// Build the notification for an outcome event.
///
/// Returns `None` for events the relay does not forward.
#[must_use]
pub fn notification_for(event: AuctionEvent, timestamp: u64) -> Option<NotificationPayload> {
    match event {
        AuctionEvent::BidValidated(p) => Some(NotificationPayload {
            auction_id: p.auction_id,
            kind: NotificationKind::BidValidated,
            user_id: Some(p.user_id),
            value: Some(p.value),
            timestamp,
        }),
        AuctionEvent::AuctionWinner(p) => Some(NotificationPayload {
            auction_id: p.auction_id,
            kind: NotificationKind::AuctionWinner,
            user_id: p.user_id,
            value: p.value,
            timestamp,
        }),
        _ => None,
    }
}

/// Fan-out of outcomes to per-auction channels.
pub struct NotificationRelay<P: EventPublisher> {
    subscription: Subscription,
    publisher: Arc<P>,
}

impl<P: EventPublisher> NotificationRelay<P> {
    /// Create a relay. `subscription` should cover [`RELAY_TOPICS`].
    pub fn new(subscription: Subscription, publisher: Arc<P>) -> Self {
        Self {
            subscription,
            publisher,
        }
    }

    /// The filter a relay subscription uses.
    #[must_use]
    pub fn filter() -> EventFilter {
        EventFilter::topics(RELAY_TOPICS.to_vec())
    }

    /// Run until the bus closes.
    pub async fn run(mut self) {
        info!("[relay] Notification relay started");

        while let Some(delivery) = self.subscription.recv().await {
            match AuctionEvent::from_message(delivery.message()) {
                Ok(event) => {
                    let timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
                    if let Some(notification) = notification_for(event, timestamp) {
                        let auction_id = notification.auction_id.clone();
                        let kind = notification.kind;
                        let receivers = self
                            .publisher
                            .publish(AuctionEvent::Notification(notification))
                            .await;
                        info!(
                            auction_id = %auction_id,
                            kind = ?kind,
                            receivers,
                            "[relay] Notification forwarded"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        message_id = %delivery.message().id,
                        error = %e,
                        "[relay] Dropping malformed message"
                    );
                }
            }
            delivery.ack();
        }

        info!("[relay] Notification relay stopped, bus closed");
    }
}
