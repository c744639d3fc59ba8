//! # Arbitration Errors
//!
//! Error types for the registry, the signature primitives and the
//! identity verifier. Business rejections are [`Rejection`]s, not errors:
//! they are normal outcomes of arbitration.

use shared_types::{AuctionId, AuctionStatus};
use thiserror::Error;

/// Why a bid was turned down.
///
/// Rules are checked in declaration order; the first failing rule wins.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Rejection {
    /// The auction is unknown or has not been activated yet.
    #[error("auction not open")]
    AuctionNotOpen,

    /// The auction was finalized.
    #[error("auction closed")]
    AuctionClosed,

    /// The value does not beat the current highest bid.
    #[error("not a higher bid")]
    NotHigherBid,

    /// The signature does not belong to the claimed identity.
    #[error("bad signature")]
    BadSignature,
}

/// Errors from auction registry transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No auction with this id was ever registered.
    #[error("unknown auction {0}")]
    UnknownAuction(AuctionId),

    /// The transition is not legal from the current status.
    #[error("auction {auction_id} is {status}")]
    WrongState {
        auction_id: AuctionId,
        status: AuctionStatus,
    },

    /// The auction was finalized; nothing may change it any more.
    #[error("auction {0} closed")]
    AuctionClosed(AuctionId),
}

impl RegistryError {
    /// The rejection a bid receives when the registry refuses it.
    #[must_use]
    pub fn as_rejection(&self) -> Rejection {
        match self {
            Self::AuctionClosed(_) => Rejection::AuctionClosed,
            Self::UnknownAuction(_) | Self::WrongState { .. } => Rejection::AuctionNotOpen,
        }
    }
}

/// Errors from RSA key handling and signing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Key bytes are neither SPKI PEM, PKCS#1 PEM nor SPKI DER.
    #[error("Invalid key encoding: {0}")]
    InvalidKey(String),

    /// Key generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Signing failed.
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Transient identity verification failures.
///
/// These never mean "invalid"; the caller should retry later.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifierError {
    /// The key registry did not answer in time.
    #[error("key lookup for {user_id} timed out after {timeout_ms}ms")]
    LookupTimeout { user_id: String, timeout_ms: u64 },

    /// The key registry failed.
    #[error("key registry unavailable: {0}")]
    Unavailable(String),
}
