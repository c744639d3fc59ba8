//! # Event Payloads
//!
//! Wire payloads carried by the event bus, one struct per event type.
//!
//! ## Design Rules
//!
//! - Payloads are plain JSON objects; the topic identifies the payload type.
//! - Unknown fields are ignored so that producers may attach extra context.
//! - `validate()` enforces the constraints serde cannot express.

use crate::entities::{Amount, AuctionId, HighestBid, Timestamp, UserId};
use crate::errors::PayloadError;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

// =============================================================================
// INBOUND: LIFECYCLE (Scheduler → Arbiter)
// =============================================================================

/// An auction opened for bidding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionStartedPayload {
    /// The auction being opened.
    pub auction_id: AuctionId,
    /// Description of the lot.
    pub description: String,
    /// Scheduled opening time.
    pub scheduled_start: Timestamp,
    /// Scheduled closing time.
    pub scheduled_end: Timestamp,
}

impl AuctionStartedPayload {
    /// Check field constraints.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.auction_id.is_empty() {
            return Err(PayloadError::EmptyField("auction_id"));
        }
        if self.scheduled_end < self.scheduled_start {
            return Err(PayloadError::InvertedWindow);
        }
        Ok(())
    }
}

/// An auction closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionEndedPayload {
    /// The auction being closed.
    pub auction_id: AuctionId,
}

impl AuctionEndedPayload {
    /// Check field constraints.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.auction_id.is_empty() {
            return Err(PayloadError::EmptyField("auction_id"));
        }
        Ok(())
    }
}

// =============================================================================
// INBOUND: BIDS (Client → Arbiter)
// =============================================================================

/// A signed bid as submitted by a client.
///
/// The signature covers the canonical encoding of
/// `{auction_id, user_id, value}` and travels hex-encoded.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSubmittedPayload {
    /// Target auction.
    pub auction_id: AuctionId,
    /// Claimed bidder identity.
    pub user_id: UserId,
    /// Offered value.
    pub value: Amount,
    /// RSA-PSS signature bytes.
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
}

impl BidSubmittedPayload {
    /// Check field constraints.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.auction_id.is_empty() {
            return Err(PayloadError::EmptyField("auction_id"));
        }
        if self.user_id.is_empty() {
            return Err(PayloadError::EmptyField("user_id"));
        }
        if self.value.is_zero() {
            return Err(PayloadError::NonPositiveValue);
        }
        if self.signature.is_empty() {
            return Err(PayloadError::EmptySignature);
        }
        Ok(())
    }
}

// =============================================================================
// OUTBOUND: OUTCOMES (Arbiter → Relay)
// =============================================================================

/// A bid that passed arbitration and now leads its auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidValidatedPayload {
    /// The auction the bid leads.
    pub auction_id: AuctionId,
    /// The new leader.
    pub user_id: UserId,
    /// The new leading value.
    pub value: Amount,
}

/// The outcome of a closed auction.
///
/// `user_id` and `value` are absent when the auction closed without a valid
/// bid; the event is still emitted so that listeners never wait forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionWinnerPayload {
    /// The closed auction.
    pub auction_id: AuctionId,
    /// The winner, if any bid was accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// The winning value, if any bid was accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Amount>,
}

impl AuctionWinnerPayload {
    /// Build the outcome from the highest bid captured at finalization.
    pub fn from_highest(auction_id: impl Into<AuctionId>, highest: &HighestBid) -> Self {
        match highest {
            HighestBid::None => Self {
                auction_id: auction_id.into(),
                user_id: None,
                value: None,
            },
            HighestBid::Leading { user_id, value } => Self {
                auction_id: auction_id.into(),
                user_id: Some(user_id.clone()),
                value: Some(*value),
            },
        }
    }

    /// Whether the auction closed with a winner.
    #[must_use]
    pub fn has_winner(&self) -> bool {
        self.user_id.is_some()
    }
}

// =============================================================================
// OUTBOUND: NOTIFICATIONS (Relay → Clients)
// =============================================================================

/// What a per-auction notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new leading bid.
    BidValidated,
    /// The auction closed.
    AuctionWinner,
}

/// A validated-bid or winner event re-routed to an auction's own channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// The auction this notification belongs to.
    pub auction_id: AuctionId,
    /// Notification type.
    pub kind: NotificationKind,
    /// Bidder concerned, absent for a no-winner close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Value concerned, absent for a no-winner close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Amount>,
    /// Unix seconds when the relay forwarded the event.
    pub timestamp: u64,
}
