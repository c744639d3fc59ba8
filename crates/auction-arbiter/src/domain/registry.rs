//! # Auction Registry
//!
//! Authoritative in-memory state of every known auction.
//!
//! ## Locking
//!
//! Each auction lives behind its own `parking_lot::Mutex`, stored in a
//! sharded `DashMap`. The map guard is released before an auction's mutex
//! is taken, so no lock ever spans two auctions and no operation blocks the
//! whole map. Every operation on one auction id is linearizable.
//!
//! ## Invariants
//!
//! - Status only moves `Scheduled → Active → Finalized`.
//! - The leading value never decreases; ties keep the incumbent.
//! - `finalize` returns the highest bid atomically with the transition.

use crate::domain::entities::{AuctionSnapshot, StatusCounts};
use crate::domain::errors::{Rejection, RegistryError};
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::{Amount, Auction, AuctionId, AuctionStatus, HighestBid};
use std::sync::Arc;

#[derive(Debug)]
struct AuctionRecord {
    auction: Auction,
    highest: HighestBid,
}

impl AuctionRecord {
    fn not_open(&self) -> RegistryError {
        match self.auction.status {
            AuctionStatus::Finalized => RegistryError::AuctionClosed(self.auction.auction_id.clone()),
            status => RegistryError::WrongState {
                auction_id: self.auction.auction_id.clone(),
                status,
            },
        }
    }
}

/// Concurrent store of auctions and their leading bids.
#[derive(Debug, Default)]
pub struct AuctionRegistry {
    auctions: DashMap<AuctionId, Arc<Mutex<AuctionRecord>>>,
}

impl AuctionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, auction_id: &str) -> Option<Arc<Mutex<AuctionRecord>>> {
        self.auctions.get(auction_id).map(|entry| Arc::clone(entry.value()))
    }

    fn require(&self, auction_id: &str) -> Result<Arc<Mutex<AuctionRecord>>, RegistryError> {
        self.record(auction_id)
            .ok_or_else(|| RegistryError::UnknownAuction(auction_id.to_string()))
    }

    /// Current view of an auction.
    #[must_use]
    pub fn get(&self, auction_id: &str) -> Option<Auction> {
        self.record(auction_id).map(|r| r.lock().auction.clone())
    }

    /// Current leading bid of an auction.
    #[must_use]
    pub fn highest_bid(&self, auction_id: &str) -> Option<HighestBid> {
        self.record(auction_id).map(|r| r.lock().highest.clone())
    }

    /// Auction and leading bid, read under one lock.
    #[must_use]
    pub fn snapshot(&self, auction_id: &str) -> Option<AuctionSnapshot> {
        self.record(auction_id).map(|r| {
            let record = r.lock();
            AuctionSnapshot {
                auction: record.auction.clone(),
                highest: record.highest.clone(),
            }
        })
    }

    /// Insert an announced auction unless one with the same id exists.
    ///
    /// The stored record always starts `Scheduled`, whatever status the
    /// argument carries. Returns `true` when inserted.
    pub fn register(&self, auction: Auction) -> bool {
        let mut inserted = false;
        self.auctions
            .entry(auction.auction_id.clone())
            .or_insert_with(|| {
                inserted = true;
                Arc::new(Mutex::new(AuctionRecord {
                    auction: Auction {
                        status: AuctionStatus::Scheduled,
                        ..auction
                    },
                    highest: HighestBid::None,
                }))
            });
        inserted
    }

    /// `Scheduled → Active`.
    pub fn activate(&self, auction_id: &str) -> Result<(), RegistryError> {
        let record = self.require(auction_id)?;
        let mut record = record.lock();
        match record.auction.status {
            AuctionStatus::Scheduled => {
                record.auction.status = AuctionStatus::Active;
                Ok(())
            }
            _ => Err(record.not_open()),
        }
    }

    /// `Active → Finalized`, returning the highest bid at that instant.
    pub fn finalize(&self, auction_id: &str) -> Result<HighestBid, RegistryError> {
        let record = self.require(auction_id)?;
        let mut record = record.lock();
        match record.auction.status {
            AuctionStatus::Active => {
                record.auction.status = AuctionStatus::Finalized;
                Ok(record.highest.clone())
            }
            _ => Err(record.not_open()),
        }
    }

    /// Read-only pre-check of the status and value rules for a bid.
    pub fn assess_bid(&self, auction_id: &str, value: Amount) -> Result<(), Rejection> {
        let record = self.record(auction_id).ok_or(Rejection::AuctionNotOpen)?;
        let record = record.lock();
        match record.auction.status {
            AuctionStatus::Active if record.highest.is_outbid_by(value) => Ok(()),
            AuctionStatus::Active => Err(Rejection::NotHigherBid),
            AuctionStatus::Finalized => Err(Rejection::AuctionClosed),
            AuctionStatus::Scheduled => Err(Rejection::AuctionNotOpen),
        }
    }

    /// Compare-and-replace the leading bid.
    ///
    /// Returns `Ok(true)` when the bid became the new highest, `Ok(false)`
    /// when it did not beat the current one.
    pub fn record_bid(
        &self,
        auction_id: &str,
        user_id: &str,
        value: Amount,
    ) -> Result<bool, RegistryError> {
        let record = self.require(auction_id)?;
        let mut record = record.lock();
        if record.auction.status != AuctionStatus::Active {
            return Err(record.not_open());
        }
        if !record.highest.is_outbid_by(value) {
            return Ok(false);
        }
        record.highest = HighestBid::Leading {
            user_id: user_id.to_string(),
            value,
        };
        Ok(true)
    }

    /// Number of known auctions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    /// Returns true when no auction is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    /// Known auctions per status.
    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        let records: Vec<_> = self
            .auctions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut counts = StatusCounts::default();
        for record in records {
            match record.lock().auction.status {
                AuctionStatus::Scheduled => counts.scheduled += 1,
                AuctionStatus::Active => counts.active += 1,
                AuctionStatus::Finalized => counts.finalized += 1,
            }
        }
        counts
    }
}
