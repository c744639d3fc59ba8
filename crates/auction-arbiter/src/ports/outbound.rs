//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits that define dependencies the arbitration service needs.

use async_trait::async_trait;
use shared_types::ipc::{AuctionWinnerPayload, BidValidatedPayload};
use thiserror::Error;

/// Error from key registry operations.
#[derive(Debug, Error)]
pub enum KeyRegistryError {
    /// Reading or writing key material failed.
    #[error("Key store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The user id cannot name a key.
    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),
}

/// Lookup of registered bidder public keys.
///
/// Identities are immutable once registered, so answers may be cached
/// indefinitely.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Resolve the public key bytes (PEM or DER) of a bidder.
    ///
    /// # Returns
    /// * `Ok(None)` - The identity is not registered
    ///
    /// # Errors
    /// * `KeyRegistryError::Io` - The store could not be read
    async fn resolve_public_key(&self, user_id: &str) -> Result<Option<Vec<u8>>, KeyRegistryError>;
}

/// Sink for arbitration outcomes.
///
/// Publishing has no error path: the count of receivers is returned and a
/// message nobody listens to is simply dropped.
#[async_trait]
pub trait OutcomePublisher: Send + Sync {
    /// Emit `bid-validated`.
    async fn publish_bid_validated(&self, payload: BidValidatedPayload) -> usize;

    /// Emit `auction-winner`.
    async fn publish_winner(&self, payload: AuctionWinnerPayload) -> usize;
}
