//! # Auction Scheduler
//!
//! Decides when auctions open and close. The catalog comes from a JSON file
//! or the built-in demo set; each poll announces the transitions that are
//! due on the bus.
//!
//! ## Rules
//!
//! - A pending auction is started when `start <= now < end`.
//! - A started auction is ended when `now >= end`.
//! - Each transition is announced once. An auction whose whole window
//!   passed before it could be started is never announced.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared_bus::{AuctionEvent, EventPublisher};
use shared_types::ipc::{AuctionEndedPayload, AuctionStartedPayload};
use shared_types::{AuctionId, Timestamp};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// One auction in the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Auction identifier.
    pub id: AuctionId,
    /// Description of the lot.
    pub description: String,
    /// Opening time.
    pub start: Timestamp,
    /// Closing time.
    pub end: Timestamp,
}

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("auction {0} has an empty id or description")]
    EmptyField(AuctionId),

    #[error("auction {0} ends before it starts")]
    InvertedWindow(AuctionId),

    #[error("auction {0} is listed twice")]
    DuplicateId(AuctionId),
}

/// Parse and validate a JSON catalog (an array of entries).
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<CatalogEntry>, CatalogError> {
    let entries: Vec<CatalogEntry> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::new();
    for entry in &entries {
        if entry.id.is_empty() || entry.description.is_empty() {
            return Err(CatalogError::EmptyField(entry.id.clone()));
        }
        if entry.end < entry.start {
            return Err(CatalogError::InvertedWindow(entry.id.clone()));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(CatalogError::DuplicateId(entry.id.clone()));
        }
    }

    Ok(entries)
}

/// Read a catalog file.
pub async fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&bytes)
}

/// Demo schedule relative to `now`: staggered, partly overlapping auctions.
#[must_use]
pub fn demo_catalog(now: Timestamp) -> Vec<CatalogEntry> {
    let lots = [
        ("A1", "Vintage mechanical wristwatch", 10, 130),
        ("A2", "13-inch laptop, 512GB", 40, 220),
        ("A3", "Game console with two controllers", 90, 300),
    ];

    lots.into_iter()
        .map(|(id, description, start, end)| CatalogEntry {
            id: id.to_string(),
            description: description.to_string(),
            start: now + chrono::Duration::seconds(start),
            end: now + chrono::Duration::seconds(end),
        })
        .collect()
}

/// Where an auction stands from the scheduler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not announced yet.
    Pending,
    /// `auction-started` published.
    Started,
    /// `auction-ended` published.
    Ended,
}

/// Polls the catalog and publishes lifecycle events.
pub struct AuctionScheduler<P: EventPublisher> {
    publisher: Arc<P>,
    entries: Vec<(CatalogEntry, Phase)>,
    poll_interval: Duration,
}

impl<P: EventPublisher> AuctionScheduler<P> {
    pub fn new(publisher: Arc<P>, catalog: Vec<CatalogEntry>, poll_interval: Duration) -> Self {
        Self {
            publisher,
            entries: catalog.into_iter().map(|e| (e, Phase::Pending)).collect(),
            poll_interval,
        }
    }

    /// Phase of an auction, if it is in the catalog.
    pub fn phase(&self, auction_id: &str) -> Option<Phase> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.id == auction_id)
            .map(|(_, phase)| *phase)
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Announce every transition due at `now`. Returns how many were published.
    pub async fn tick(&mut self, now: Timestamp) -> usize {
        let mut announced = 0;

        for (entry, phase) in &mut self.entries {
            match *phase {
                Phase::Pending if entry.start <= now && now < entry.end => {
                    let receivers = self
                        .publisher
                        .publish(AuctionEvent::AuctionStarted(AuctionStartedPayload {
                            auction_id: entry.id.clone(),
                            description: entry.description.clone(),
                            scheduled_start: entry.start,
                            scheduled_end: entry.end,
                        }))
                        .await;
                    *phase = Phase::Started;
                    announced += 1;
                    info!(
                        auction_id = %entry.id,
                        end = %entry.end,
                        receivers,
                        "[scheduler] Auction started"
                    );
                }
                Phase::Started if now >= entry.end => {
                    let receivers = self
                        .publisher
                        .publish(AuctionEvent::AuctionEnded(AuctionEndedPayload {
                            auction_id: entry.id.clone(),
                        }))
                        .await;
                    *phase = Phase::Ended;
                    announced += 1;
                    info!(auction_id = %entry.id, receivers, "[scheduler] Auction ended");
                }
                _ => {}
            }
        }

        announced
    }

    /// Poll forever at the configured interval.
    pub async fn run(mut self) {
        info!(
            auctions = self.entries.len(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "[scheduler] Scheduler started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let announced = self.tick(Utc::now()).await;
            if announced > 0 {
                debug!(announced, "[scheduler] Poll complete");
            }
        }
    }
}
