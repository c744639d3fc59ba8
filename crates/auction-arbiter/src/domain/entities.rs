//! # Domain Entities
//!
//! Commands the engine consumes and the outcomes it reports.

use crate::domain::errors::{RegistryError, Rejection};
use serde::Serialize;
use shared_bus::AuctionEvent;
pub use shared_types::{
    Amount, Auction, AuctionId, AuctionStatus, HighestBid, Timestamp, UserId,
};
use shared_types::ipc::{AuctionEndedPayload, AuctionStartedPayload, BidSubmittedPayload};

/// An inbound event the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationCommand {
    /// Open an auction (registering it first if unknown).
    Start(AuctionStartedPayload),
    /// Close an auction and determine the winner.
    End(AuctionEndedPayload),
    /// Arbitrate a signed bid.
    Bid(BidSubmittedPayload),
}

impl ArbitrationCommand {
    /// The auction this command targets; used for shard routing.
    #[must_use]
    pub fn auction_id(&self) -> &str {
        match self {
            Self::Start(p) => &p.auction_id,
            Self::End(p) => &p.auction_id,
            Self::Bid(p) => &p.auction_id,
        }
    }
}

impl TryFrom<AuctionEvent> for ArbitrationCommand {
    type Error = AuctionEvent;

    /// Outbound events are handed back unchanged.
    fn try_from(event: AuctionEvent) -> Result<Self, Self::Error> {
        match event {
            AuctionEvent::AuctionStarted(p) => Ok(Self::Start(p)),
            AuctionEvent::AuctionEnded(p) => Ok(Self::End(p)),
            AuctionEvent::BidSubmitted(p) => Ok(Self::Bid(p)),
            other => Err(other),
        }
    }
}

/// What the bus consumer should do with the delivery that carried a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Processing is complete (whatever the result).
    Ack,
    /// Processing could not happen now; deliver again later.
    Requeue,
}

/// The locally observable result of handling one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// The bid is the new highest; `bid-validated` was emitted.
    BidAccepted {
        auction_id: AuctionId,
        user_id: UserId,
        value: Amount,
    },

    /// The bid was turned down; nothing was emitted.
    BidRejected {
        auction_id: AuctionId,
        user_id: UserId,
        value: Amount,
        reason: Rejection,
    },

    /// The auction moved to `Active`.
    AuctionActivated { auction_id: AuctionId },

    /// The auction moved to `Finalized`; `auction-winner` was emitted.
    AuctionFinalized {
        auction_id: AuctionId,
        winner: HighestBid,
    },

    /// A lifecycle event had no effect (unknown, wrong state, closed).
    LifecycleIgnored {
        auction_id: AuctionId,
        reason: RegistryError,
    },

    /// A collaborator was unavailable; state is untouched.
    Deferred { auction_id: AuctionId, reason: String },

    /// An internal invariant did not hold for this one event.
    InternalError { auction_id: AuctionId, detail: String },
}

impl ArbitrationOutcome {
    /// How the delivery carrying the command must be settled.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Deferred { .. } => Disposition::Requeue,
            _ => Disposition::Ack,
        }
    }

    /// The auction the outcome concerns.
    #[must_use]
    pub fn auction_id(&self) -> &str {
        match self {
            Self::BidAccepted { auction_id, .. }
            | Self::BidRejected { auction_id, .. }
            | Self::AuctionActivated { auction_id }
            | Self::AuctionFinalized { auction_id, .. }
            | Self::LifecycleIgnored { auction_id, .. }
            | Self::Deferred { auction_id, .. }
            | Self::InternalError { auction_id, .. } => auction_id,
        }
    }

    /// The rejection reason, for rejected bids.
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::BidRejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns true for an accepted bid.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::BidAccepted { .. })
    }
}

/// A consistent copy of one auction's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSnapshot {
    pub auction: Auction,
    pub highest: HighestBid,
}

/// Number of known auctions per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub active: usize,
    pub finalized: usize,
}
