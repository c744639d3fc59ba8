//! Shared fixtures for unit tests.

use crate::adapters::key_store::InMemoryKeyRegistry;
use crate::domain::canonical::sign_bid;
use crate::domain::signature::{encode_public_key_pem, generate_keypair};
use crate::ports::outbound::OutcomePublisher;
use async_trait::async_trait;
use parking_lot::Mutex;
use rsa::{RsaPrivateKey, RsaPublicKey};
use shared_types::ipc::{AuctionWinnerPayload, BidSubmittedPayload, BidValidatedPayload};
use shared_types::Amount;
use std::sync::OnceLock;

// Small keys keep debug-build key generation fast.
const TEST_KEY_BITS: usize = 1024;

fn cached(cell: &'static OnceLock<(RsaPrivateKey, RsaPublicKey)>) -> (&'static RsaPrivateKey, &'static RsaPublicKey) {
    let (private_key, public_key) =
        cell.get_or_init(|| generate_keypair(TEST_KEY_BITS).expect("keygen"));
    (private_key, public_key)
}

pub fn alice() -> (&'static RsaPrivateKey, &'static RsaPublicKey) {
    static KEYS: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();
    cached(&KEYS)
}

pub fn bob() -> (&'static RsaPrivateKey, &'static RsaPublicKey) {
    static KEYS: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();
    cached(&KEYS)
}

pub fn amount(units: u64) -> Amount {
    Amount::from_whole(units).expect("amount")
}

/// Registry knowing `u1` (alice's key) and `u2` (bob's key).
pub fn key_registry() -> InMemoryKeyRegistry {
    let registry = InMemoryKeyRegistry::new();
    registry.insert("u1", encode_public_key_pem(alice().1).unwrap().into_bytes());
    registry.insert("u2", encode_public_key_pem(bob().1).unwrap().into_bytes());
    registry
}

/// A correctly signed bid by `u1` or `u2`.
pub fn signed_bid(auction_id: &str, user_id: &str, units: u64) -> BidSubmittedPayload {
    let key = if user_id == "u2" { bob().0 } else { alice().0 };
    sign_bid(key, auction_id, user_id, amount(units)).unwrap()
}

/// Records every published outcome.
#[derive(Default)]
pub struct RecordingPublisher {
    pub validated: Mutex<Vec<BidValidatedPayload>>,
    pub winners: Mutex<Vec<AuctionWinnerPayload>>,
}

#[async_trait]
impl OutcomePublisher for RecordingPublisher {
    async fn publish_bid_validated(&self, payload: BidValidatedPayload) -> usize {
        self.validated.lock().push(payload);
        1
    }

    async fn publish_winner(&self, payload: AuctionWinnerPayload) -> usize {
        self.winners.lock().push(payload);
        1
    }
}
