//! # Auction Bidder
//!
//! Client-side helpers: create a bidder identity and produce signed
//! `bid-submitted` payloads that the arbitration service will accept.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use auction_arbiter::domain::signature::{
    encode_private_key_pem, encode_public_key_pem, generate_keypair, parse_private_key_pem,
};
use auction_arbiter::{sign_bid, FileKeyRegistry};
use shared_types::Amount;
use tracing::info;

/// Files written by [`keygen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedIdentity {
    /// Public key registered under the key directory.
    pub public_key: PathBuf,
    /// Private key kept by the bidder.
    pub private_key: PathBuf,
}

/// Generate a key pair, register the public half and write the private half.
pub async fn keygen(
    user_id: &str,
    keys_dir: &Path,
    out: &Path,
    bits: usize,
) -> Result<GeneratedIdentity> {
    let (private_key, public_key) = generate_keypair(bits)?;

    let registry = FileKeyRegistry::new(keys_dir);
    let public_pem = encode_public_key_pem(&public_key)?;
    let public_path = registry
        .register(user_id, public_pem.as_bytes())
        .await
        .with_context(|| format!("Failed to register public key for {user_id}"))?;

    let private_pem = encode_private_key_pem(&private_key)?;
    tokio::fs::write(out, private_pem.as_bytes())
        .await
        .with_context(|| format!("Failed to write private key to {}", out.display()))?;

    info!(user_id, bits, public_key = %public_path.display(), "Identity generated");

    Ok(GeneratedIdentity {
        public_key: public_path,
        private_key: out.to_path_buf(),
    })
}

/// Sign a bid with a PKCS#8 PEM private key and return the payload as JSON.
pub fn sign(private_key_pem: &str, user_id: &str, auction_id: &str, value: &str) -> Result<String> {
    let value: Amount = value
        .parse()
        .with_context(|| format!("Invalid bid value {value:?}"))?;
    let private_key = parse_private_key_pem(private_key_pem)?;
    let payload = sign_bid(&private_key, auction_id, user_id, value)?;
    payload.validate()?;
    Ok(serde_json::to_string(&payload)?)
}

/// [`sign`] with the key read from a file.
pub async fn sign_with_key_file(
    key: &Path,
    user_id: &str,
    auction_id: &str,
    value: &str,
) -> Result<String> {
    let pem = tokio::fs::read_to_string(key)
        .await
        .with_context(|| format!("Failed to read private key {}", key.display()))?;
    sign(&pem, user_id, auction_id, value)
}
