//! # Arbitration Service
//!
//! Application service layer that implements the `ArbitrationApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`ArbitrationApi`)
//! - Resolves identities through the outbound `KeyRegistry` (via the verifier)
//! - Emits outcomes through the outbound `OutcomePublisher`
//! - Delegates state transitions to the domain `AuctionRegistry`
//!
//! ## Bid Acceptance (first failing rule wins)
//!
//! ```text
//! BidSubmitted ──→ [open?] ──no──→ "auction not open" / "auction closed"
//!                     │
//!                    yes
//!                     ↓
//!                 [higher?] ──no──→ "not a higher bid"
//!                     │
//!                    yes
//!                     ↓
//!              [signature ok?] ──no──→ "bad signature"
//!                     │      └─lookup failed──→ deferred (requeue)
//!                    yes
//!                     ↓
//!              record_bid (CAS) ──lost race──→ "not a higher bid"
//!                     │
//!                     ↓
//!               BidValidated
//! ```

use crate::domain::canonical::canonical_payload;
use crate::domain::entities::ArbitrationOutcome;
use crate::domain::errors::{RegistryError, Rejection};
use crate::domain::registry::AuctionRegistry;
use crate::identity::IdentityVerifier;
use crate::ports::inbound::ArbitrationApi;
use crate::ports::outbound::{KeyRegistry, OutcomePublisher};
use async_trait::async_trait;
use shared_types::ipc::{
    AuctionEndedPayload, AuctionStartedPayload, AuctionWinnerPayload, BidSubmittedPayload,
    BidValidatedPayload,
};
use shared_types::Auction;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Arbitration & lifecycle engine.
///
/// The engine is the only writer of the registry. It never panics on a
/// single event: every path ends in an [`ArbitrationOutcome`].
pub struct ArbitrationEngine<K: KeyRegistry, O: OutcomePublisher> {
    registry: Arc<AuctionRegistry>,
    verifier: IdentityVerifier<K>,
    publisher: Arc<O>,
}

impl<K: KeyRegistry, O: OutcomePublisher> ArbitrationEngine<K, O> {
    /// Create a new engine.
    pub fn new(registry: Arc<AuctionRegistry>, verifier: IdentityVerifier<K>, publisher: Arc<O>) -> Self {
        Self {
            registry,
            verifier,
            publisher,
        }
    }

    /// The auction registry (read access for observers).
    pub fn registry(&self) -> &Arc<AuctionRegistry> {
        &self.registry
    }

    /// The identity verifier.
    pub fn verifier(&self) -> &IdentityVerifier<K> {
        &self.verifier
    }

    fn reject(payload: BidSubmittedPayload, reason: Rejection) -> ArbitrationOutcome {
        info!(
            auction_id = %payload.auction_id,
            user_id = %payload.user_id,
            value = %payload.value,
            reason = %reason,
            "[arbiter] Bid rejected"
        );
        ArbitrationOutcome::BidRejected {
            auction_id: payload.auction_id,
            user_id: payload.user_id,
            value: payload.value,
            reason,
        }
    }

    fn ignore(auction_id: String, reason: RegistryError) -> ArbitrationOutcome {
        debug!(auction_id = %auction_id, reason = %reason, "[arbiter] Lifecycle event ignored");
        ArbitrationOutcome::LifecycleIgnored { auction_id, reason }
    }
}

#[async_trait]
impl<K: KeyRegistry, O: OutcomePublisher> ArbitrationApi for ArbitrationEngine<K, O> {
    async fn on_auction_started(&self, payload: AuctionStartedPayload) -> ArbitrationOutcome {
        let AuctionStartedPayload {
            auction_id,
            description,
            scheduled_start,
            scheduled_end,
        } = payload;

        if self.registry.register(Auction::scheduled(
            auction_id.clone(),
            description,
            scheduled_start,
            scheduled_end,
        )) {
            debug!(auction_id = %auction_id, "[arbiter] Auction registered");
        }

        match self.registry.activate(&auction_id) {
            Ok(()) => {
                info!(auction_id = %auction_id, "[arbiter] Auction open for bids");
                ArbitrationOutcome::AuctionActivated { auction_id }
            }
            Err(reason) => Self::ignore(auction_id, reason),
        }
    }

    async fn on_auction_ended(&self, payload: AuctionEndedPayload) -> ArbitrationOutcome {
        let auction_id = payload.auction_id;

        let winner = match self.registry.finalize(&auction_id) {
            Ok(winner) => winner,
            Err(reason) => return Self::ignore(auction_id, reason),
        };

        let outcome = AuctionWinnerPayload::from_highest(auction_id.clone(), &winner);
        if outcome.has_winner() {
            info!(
                auction_id = %auction_id,
                user_id = ?outcome.user_id,
                value = ?outcome.value.map(|v| v.to_string()),
                "[arbiter] Auction closed with winner"
            );
        } else {
            info!(auction_id = %auction_id, "[arbiter] Auction closed without bids");
        }

        self.publisher.publish_winner(outcome).await;
        ArbitrationOutcome::AuctionFinalized { auction_id, winner }
    }

    async fn on_bid_submitted(&self, payload: BidSubmittedPayload) -> ArbitrationOutcome {
        // Rules 1 and 2: open and higher. Cheap, so checked before the
        // signature.
        if let Err(reason) = self.registry.assess_bid(&payload.auction_id, payload.value) {
            return Self::reject(payload, reason);
        }

        // Rule 3: signature. No registry lock is held across the lookup.
        let message = canonical_payload(&payload);
        match self
            .verifier
            .check(&payload.user_id, &message, &payload.signature)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Self::reject(payload, Rejection::BadSignature),
            Err(e) => {
                warn!(
                    auction_id = %payload.auction_id,
                    user_id = %payload.user_id,
                    error = %e,
                    "[arbiter] Identity check unavailable, bid deferred"
                );
                return ArbitrationOutcome::Deferred {
                    auction_id: payload.auction_id,
                    reason: e.to_string(),
                };
            }
        }

        match self
            .registry
            .record_bid(&payload.auction_id, &payload.user_id, payload.value)
        {
            Ok(true) => {}
            // Another bid took the lead since the pre-check.
            Ok(false) => return Self::reject(payload, Rejection::NotHigherBid),
            Err(RegistryError::UnknownAuction(_)) => {
                error!(
                    auction_id = %payload.auction_id,
                    user_id = %payload.user_id,
                    "[arbiter] Auction vanished between assessment and recording"
                );
                return ArbitrationOutcome::InternalError {
                    auction_id: payload.auction_id,
                    detail: "auction missing after successful assessment".to_string(),
                };
            }
            Err(e) => {
                let reason = e.as_rejection();
                return Self::reject(payload, reason);
            }
        }

        info!(
            auction_id = %payload.auction_id,
            user_id = %payload.user_id,
            value = %payload.value,
            "[arbiter] New highest bid"
        );

        let BidSubmittedPayload {
            auction_id,
            user_id,
            value,
            ..
        } = payload;
        self.publisher
            .publish_bid_validated(BidValidatedPayload {
                auction_id: auction_id.clone(),
                user_id: user_id.clone(),
                value,
            })
            .await;

        ArbitrationOutcome::BidAccepted {
            auction_id,
            user_id,
            value,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
