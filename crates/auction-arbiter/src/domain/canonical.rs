//! # Canonical Bid Encoding
//!
//! The exact bytes a bidder signs: compact JSON with keys in name order
//! and the value rendered with two fractional digits.
//!
//! ```text
//! {"auction_id":"A1","user_id":"u1","value":"150.00"}
//! ```

use crate::domain::errors::SignatureError;
use crate::domain::signature;
use rsa::RsaPrivateKey;
use serde_json::json;
use shared_types::ipc::BidSubmittedPayload;
use shared_types::Amount;

/// Encode the signed portion of a bid.
#[must_use]
pub fn canonical_bid(auction_id: &str, user_id: &str, value: Amount) -> Vec<u8> {
    // serde_json maps keep keys ordered, and Display is the compact form.
    json!({
        "auction_id": auction_id,
        "user_id": user_id,
        "value": value.to_string(),
    })
    .to_string()
    .into_bytes()
}

/// The canonical bytes of a submitted bid.
#[must_use]
pub fn canonical_payload(payload: &BidSubmittedPayload) -> Vec<u8> {
    canonical_bid(&payload.auction_id, &payload.user_id, payload.value)
}

/// Build a signed `bid-submitted` payload.
pub fn sign_bid(
    private_key: &RsaPrivateKey,
    auction_id: &str,
    user_id: &str,
    value: Amount,
) -> Result<BidSubmittedPayload, SignatureError> {
    let message = canonical_bid(auction_id, user_id, value);
    let signature = signature::sign(private_key, &message)?;
    Ok(BidSubmittedPayload {
        auction_id: auction_id.to_string(),
        user_id: user_id.to_string(),
        value,
        signature,
    })
}
