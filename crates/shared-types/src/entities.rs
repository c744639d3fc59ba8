//! # Core Domain Entities
//!
//! Defines the auction entities shared by every service on the bus.
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`
//! - **Auction**: `Auction`, `AuctionStatus`, `HighestBid`
//! - **Money**: `Amount` (fixed-point, two fractional digits)

use crate::errors::AmountError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: IDENTIFIERS
// =============================================================================

/// Identifier of an auction, assigned by the scheduler.
pub type AuctionId = String;

/// Identifier of a registered bidder.
pub type UserId = String;

/// Wall-clock timestamp used in lifecycle announcements.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// CLUSTER B: MONEY
// =============================================================================

/// A non-negative decimal amount with exactly two fractional digits.
///
/// Stored as a count of hundredths so that comparisons are exact. The
/// canonical text form always carries both fractional digits (`"150.00"`),
/// which is what gets signed by bidders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    /// Number of minor units per whole unit.
    pub const SCALE: u64 = 100;

    /// Zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Build an amount from hundredths.
    #[must_use]
    pub const fn from_minor_units(minor: u64) -> Self {
        Self(minor)
    }

    /// Build an amount from whole units, `None` on overflow.
    #[must_use]
    pub fn from_whole(units: u64) -> Option<Self> {
        units.checked_mul(Self::SCALE).map(Self)
    }

    /// The amount in hundredths.
    #[must_use]
    pub const fn minor_units(self) -> u64 {
        self.0
    }

    /// Returns true for the zero amount.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (s, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let fraction_minor = match fraction {
            None => 0,
            Some(digits) => {
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AmountError::Invalid(s.to_string()));
                }
                if digits.len() > 2 {
                    return Err(AmountError::TooManyDecimals(s.to_string()));
                }
                let parsed: u64 = digits
                    .parse()
                    .map_err(|_| AmountError::Invalid(s.to_string()))?;
                if digits.len() == 1 {
                    parsed * 10
                } else {
                    parsed
                }
            }
        };

        let whole: u64 = whole.parse().map_err(|_| AmountError::Overflow)?;
        whole
            .checked_mul(Self::SCALE)
            .and_then(|minor| minor.checked_add(fraction_minor))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Wire forms accepted for an amount: a decimal string or a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(text) => text,
            RawAmount::Number(number) => number.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// CLUSTER C: AUCTIONS
// =============================================================================

/// Lifecycle status of an auction.
///
/// Monotonic: `Scheduled → Active → Finalized`. No skips, no reversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    /// Announced but not yet accepting bids.
    Scheduled,
    /// Accepting bids.
    Active,
    /// Closed; the highest bid at closing is the winner.
    Finalized,
}

impl AuctionStatus {
    /// The only status this one may move to, if any.
    #[must_use]
    pub const fn next(self) -> Option<AuctionStatus> {
        match self {
            Self::Scheduled => Some(Self::Active),
            Self::Active => Some(Self::Finalized),
            Self::Finalized => None,
        }
    }

    /// Whether `self → to` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, to: AuctionStatus) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// An auction as known to the arbitration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    /// Unique auction identifier.
    pub auction_id: AuctionId,
    /// Human-readable description of the lot.
    pub description: String,
    /// When the scheduler intends to open bidding.
    pub scheduled_start: Timestamp,
    /// When the scheduler intends to close bidding.
    pub scheduled_end: Timestamp,
    /// Current lifecycle status.
    pub status: AuctionStatus,
}

impl Auction {
    /// A freshly announced auction in `Scheduled` status.
    pub fn scheduled(
        auction_id: impl Into<AuctionId>,
        description: impl Into<String>,
        scheduled_start: Timestamp,
        scheduled_end: Timestamp,
    ) -> Self {
        Self {
            auction_id: auction_id.into(),
            description: description.into(),
            scheduled_start,
            scheduled_end,
            status: AuctionStatus::Scheduled,
        }
    }
}

/// The current leading bid of an auction.
///
/// `None` until the first bid is accepted; the leading value never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HighestBid {
    /// No bid has been accepted yet.
    #[default]
    None,
    /// The bid currently winning the auction.
    Leading {
        /// The bidder holding the lead.
        user_id: UserId,
        /// The leading value.
        value: Amount,
    },
}

impl HighestBid {
    /// The leading value, if any bid was accepted.
    #[must_use]
    pub fn value(&self) -> Option<Amount> {
        match self {
            Self::None => None,
            Self::Leading { value, .. } => Some(*value),
        }
    }

    /// The leading bidder, if any bid was accepted.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Leading { user_id, .. } => Some(user_id),
        }
    }

    /// Whether `value` would take the lead. Ties favor the incumbent.
    #[must_use]
    pub fn is_outbid_by(&self, value: Amount) -> bool {
        match self {
            Self::None => true,
            Self::Leading { value: current, .. } => value > *current,
        }
    }

    /// Returns true when no bid has been accepted.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
