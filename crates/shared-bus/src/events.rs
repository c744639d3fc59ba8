//! # Auction Events
//!
//! Defines the event types that flow through the shared bus, the raw
//! `BusMessage` they travel in, and subscription filters.
//!
//! Payload structs live in `shared-types/src/ipc.rs`; here they are bound to
//! topics and encoded as JSON bodies.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use shared_types::errors::PayloadError;
use shared_types::ipc::{
    AuctionEndedPayload, AuctionStartedPayload, AuctionWinnerPayload, BidSubmittedPayload,
    BidValidatedPayload, NotificationPayload,
};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
    // =========================================================================
    // SCHEDULER: LIFECYCLE
    // =========================================================================
    /// An auction opened for bidding.
    /// Source: Scheduler | Target: Arbiter
    AuctionStarted(AuctionStartedPayload),

    /// An auction closed.
    /// Source: Scheduler | Target: Arbiter
    AuctionEnded(AuctionEndedPayload),

    // =========================================================================
    // CLIENTS: BIDS
    // =========================================================================
    /// A signed bid.
    /// Source: Client | Target: Arbiter
    BidSubmitted(BidSubmittedPayload),

    // =========================================================================
    // ARBITER: OUTCOMES
    // =========================================================================
    /// A bid passed arbitration and leads its auction.
    /// Source: Arbiter | Target: Relay
    BidValidated(BidValidatedPayload),

    /// An auction closed, with or without a winner.
    /// Source: Arbiter | Target: Relay
    AuctionWinner(AuctionWinnerPayload),

    // =========================================================================
    // RELAY: PER-AUCTION FAN-OUT
    // =========================================================================
    /// An outcome re-routed to the auction's own channel.
    /// Source: Relay | Target: Clients
    Notification(NotificationPayload),
}

/// Errors turning a `BusMessage` back into an `AuctionEvent`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON for the topic's payload.
    #[error("Undecodable payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The body decoded but violates a field constraint.
    #[error("Invalid payload: {0}")]
    Invalid(#[from] PayloadError),

    /// The topic carries no typed payload.
    #[error("Topic {0} carries no auction event")]
    UntypedTopic(EventTopic),
}

impl AuctionEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::AuctionStarted(_) => EventTopic::AuctionStarted,
            Self::AuctionEnded(_) => EventTopic::AuctionEnded,
            Self::BidSubmitted(_) => EventTopic::BidSubmitted,
            Self::BidValidated(_) => EventTopic::BidValidated,
            Self::AuctionWinner(_) => EventTopic::AuctionWinner,
            Self::Notification(_) => EventTopic::AuctionNotifications,
        }
    }

    /// The auction this event concerns.
    #[must_use]
    pub fn auction_id(&self) -> &str {
        match self {
            Self::AuctionStarted(p) => &p.auction_id,
            Self::AuctionEnded(p) => &p.auction_id,
            Self::BidSubmitted(p) => &p.auction_id,
            Self::BidValidated(p) => &p.auction_id,
            Self::AuctionWinner(p) => &p.auction_id,
            Self::Notification(p) => &p.auction_id,
        }
    }

    /// Encode into a bus message. Notifications are keyed by auction.
    pub fn to_message(&self) -> Result<BusMessage, serde_json::Error> {
        let body = match self {
            Self::AuctionStarted(p) => serde_json::to_vec(p)?,
            Self::AuctionEnded(p) => serde_json::to_vec(p)?,
            Self::BidSubmitted(p) => serde_json::to_vec(p)?,
            Self::BidValidated(p) => serde_json::to_vec(p)?,
            Self::AuctionWinner(p) => serde_json::to_vec(p)?,
            Self::Notification(p) => serde_json::to_vec(p)?,
        };

        let message = BusMessage::new(self.topic(), body);
        Ok(match self {
            Self::Notification(p) => message.with_routing_key(p.auction_id.clone()),
            _ => message,
        })
    }

    /// Decode a bus message according to its topic.
    ///
    /// Inbound payloads (lifecycle and bids) are also validated.
    pub fn from_message(message: &BusMessage) -> Result<Self, DecodeError> {
        match message.topic {
            EventTopic::AuctionStarted => {
                let payload: AuctionStartedPayload = message.decode()?;
                payload.validate()?;
                Ok(Self::AuctionStarted(payload))
            }
            EventTopic::AuctionEnded => {
                let payload: AuctionEndedPayload = message.decode()?;
                payload.validate()?;
                Ok(Self::AuctionEnded(payload))
            }
            EventTopic::BidSubmitted => {
                let payload: BidSubmittedPayload = message.decode()?;
                payload.validate()?;
                Ok(Self::BidSubmitted(payload))
            }
            EventTopic::BidValidated => Ok(Self::BidValidated(message.decode()?)),
            EventTopic::AuctionWinner => Ok(Self::AuctionWinner(message.decode()?)),
            EventTopic::AuctionNotifications => Ok(Self::Notification(message.decode()?)),
            topic @ (EventTopic::DeadLetterQueue | EventTopic::All) => {
                Err(DecodeError::UntypedTopic(topic))
            }
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Auction opened (scheduler).
    AuctionStarted,
    /// Auction closed (scheduler).
    AuctionEnded,
    /// Signed bids (clients).
    BidSubmitted,
    /// Accepted bids (arbiter).
    BidValidated,
    /// Closing outcomes (arbiter).
    AuctionWinner,
    /// Per-auction fan-out (relay), routed by auction id.
    AuctionNotifications,
    /// Messages that exhausted their redeliveries.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

impl EventTopic {
    /// Stable queue-style name of the topic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AuctionStarted => "auction.started",
            Self::AuctionEnded => "auction.ended",
            Self::BidSubmitted => "bid.submitted",
            Self::BidValidated => "bid.validated",
            Self::AuctionWinner => "auction.winner",
            Self::AuctionNotifications => "auction.notifications",
            Self::DeadLetterQueue => crate::DLQ_TOPIC,
            Self::All => "*",
        }
    }
}

impl fmt::Display for EventTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A message as it travels on the bus: topic, optional routing key, raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Unique message identifier, stable across redeliveries.
    pub id: Uuid,
    /// Topic the message was published on.
    pub topic: EventTopic,
    /// Optional secondary routing key (the auction id for notifications).
    pub routing_key: Option<String>,
    /// JSON-encoded payload.
    pub body: Vec<u8>,
}

impl BusMessage {
    /// Create a message with a fresh id.
    #[must_use]
    pub fn new(topic: EventTopic, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            routing_key: None,
            body: body.into(),
        }
    }

    /// Attach a routing key.
    #[must_use]
    pub fn with_routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    /// Decode the JSON body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Filter for subscribing to specific messages.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Routing keys to include. Empty means any key.
    pub routing_keys: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all messages.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            routing_keys: Vec::new(),
        }
    }

    /// Create a filter for one auction's notification channel.
    #[must_use]
    pub fn for_auction(auction_id: impl Into<String>) -> Self {
        Self {
            topics: vec![EventTopic::AuctionNotifications],
            routing_keys: vec![auction_id.into()],
        }
    }

    /// Check if a message matches this filter.
    #[must_use]
    pub fn matches(&self, message: &BusMessage) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&message.topic);

        let key_match = self.routing_keys.is_empty()
            || message
                .routing_key
                .as_ref()
                .is_some_and(|key| self.routing_keys.contains(key));

        topic_match && key_match
    }
}
