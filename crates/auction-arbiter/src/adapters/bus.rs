//! # Event Bus Adapter
//!
//! Wires the arbitration service to the shared event bus.
//!
//! ## Event Flow
//!
//! ```text
//! Scheduler ──AuctionStarted/AuctionEnded──┐
//!                                          ↓
//! Clients ──────BidSubmitted────→ [decode_command] ──→ [Arbitration Engine]
//!                                                             │
//!                              ┌──────────────────────────────┴────────┐
//!                              ↓                                       ↓
//!                  BidValidated ──→ [Event Bus]          AuctionWinner ──→ [Event Bus]
//! ```

use crate::domain::entities::ArbitrationCommand;
use crate::ports::outbound::OutcomePublisher;
use async_trait::async_trait;
use shared_bus::{AuctionEvent, BusMessage, DecodeError, EventPublisher, EventTopic};
use shared_types::ipc::{AuctionWinnerPayload, BidValidatedPayload};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Topics the arbitration service consumes.
pub const INBOUND_TOPICS: [EventTopic; 3] = [
    EventTopic::AuctionStarted,
    EventTopic::AuctionEnded,
    EventTopic::BidSubmitted,
];

/// Why an inbound message could not become a command.
#[derive(Debug, Error)]
pub enum InboundError {
    /// The body is malformed or violates a field constraint.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The message is not an arbitration input.
    #[error("Topic {0} is not an arbitration input")]
    NotInbound(EventTopic),
}

/// Decode a bus message into an arbitration command.
pub fn decode_command(message: &BusMessage) -> Result<ArbitrationCommand, InboundError> {
    let event = AuctionEvent::from_message(message)?;
    ArbitrationCommand::try_from(event).map_err(|event| InboundError::NotInbound(event.topic()))
}

/// Outcome publisher backed by the shared event bus.
pub struct BusOutcomePublisher<P: EventPublisher> {
    publisher: Arc<P>,
}

impl<P: EventPublisher> BusOutcomePublisher<P> {
    /// Create a new bus-backed publisher.
    pub fn new(publisher: Arc<P>) -> Self {
        Self { publisher }
    }

    /// Get a reference to the event publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

#[async_trait]
impl<P: EventPublisher> OutcomePublisher for BusOutcomePublisher<P> {
    async fn publish_bid_validated(&self, payload: BidValidatedPayload) -> usize {
        let auction_id = payload.auction_id.clone();
        let receivers = self
            .publisher
            .publish(AuctionEvent::BidValidated(payload))
            .await;
        debug!(auction_id = %auction_id, receivers, "Published BidValidated");
        receivers
    }

    async fn publish_winner(&self, payload: AuctionWinnerPayload) -> usize {
        let auction_id = payload.auction_id.clone();
        let receivers = self
            .publisher
            .publish(AuctionEvent::AuctionWinner(payload))
            .await;
        debug!(auction_id = %auction_id, receivers, "Published AuctionWinner");
        receivers
    }
}
