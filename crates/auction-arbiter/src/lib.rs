//! # Auction Arbiter
//!
//! Arbitration and lifecycle engine for English auctions.
//!
//! ## Architecture
//!
//! This service follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): auction state, canonical encoding,
//!   RSA-PSS signatures. No I/O.
//! - **Ports Layer** (`ports/`): trait definitions for inbound/outbound
//!   interfaces
//! - **Service Layer** (`service.rs`, `identity.rs`): wires domain logic to
//!   ports
//! - **Dispatcher** (`dispatcher.rs`): per-auction ordering on a worker pool
//! - **Adapters** (`adapters/`): event bus codec and key stores
//!
//! ## Guarantees
//!
//! - The leading bid of an auction never decreases; ties keep the incumbent.
//! - A bid is accepted only if the auction is open, the value is higher and
//!   the signature belongs to the claimed bidder, checked in that order.
//! - Finalization is terminal and emits exactly one winner event.

pub mod adapters;
pub mod dispatcher;
pub mod domain;
pub mod identity;
pub mod ports;
pub mod service;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export public API
pub use adapters::bus::{decode_command, BusOutcomePublisher, InboundError, INBOUND_TOPICS};
pub use adapters::key_store::{is_safe_user_id, FileKeyRegistry, InMemoryKeyRegistry};
pub use dispatcher::{DispatchError, OutcomeReceiver, ShardedDispatcher};
pub use domain::canonical::{canonical_bid, canonical_payload, sign_bid};
pub use domain::entities::{
    ArbitrationCommand, ArbitrationOutcome, AuctionSnapshot, Disposition, StatusCounts,
};
pub use domain::errors::{Rejection, RegistryError, SignatureError, VerifierError};
pub use domain::registry::AuctionRegistry;
pub use identity::IdentityVerifier;
pub use ports::inbound::ArbitrationApi;
pub use ports::outbound::{KeyRegistry, KeyRegistryError, OutcomePublisher};
pub use service::ArbitrationEngine;
