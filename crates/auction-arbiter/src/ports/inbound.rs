//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of the arbitration service.

use crate::domain::entities::{ArbitrationCommand, ArbitrationOutcome};
use async_trait::async_trait;
use shared_types::ipc::{AuctionEndedPayload, AuctionStartedPayload, BidSubmittedPayload};

/// Primary Arbitration API.
///
/// Implementations must be thread-safe (`Send + Sync`). Handlers never fail:
/// every result, including collaborator trouble, is an
/// [`ArbitrationOutcome`] whose disposition tells the caller how to settle
/// the delivery.
#[async_trait]
pub trait ArbitrationApi: Send + Sync {
    /// Register (if new) and activate an announced auction.
    async fn on_auction_started(&self, payload: AuctionStartedPayload) -> ArbitrationOutcome;

    /// Finalize an auction and emit its winner.
    async fn on_auction_ended(&self, payload: AuctionEndedPayload) -> ArbitrationOutcome;

    /// Arbitrate a signed bid.
    ///
    /// Rules, first failure wins: auction open, value higher, signature valid.
    async fn on_bid_submitted(&self, payload: BidSubmittedPayload) -> ArbitrationOutcome;

    /// Route a decoded command to its handler.
    async fn handle(&self, command: ArbitrationCommand) -> ArbitrationOutcome {
        match command {
            ArbitrationCommand::Start(p) => self.on_auction_started(p).await,
            ArbitrationCommand::End(p) => self.on_auction_ended(p).await,
            ArbitrationCommand::Bid(p) => self.on_bid_submitted(p).await,
        }
    }
}
