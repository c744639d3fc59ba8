//! # RSA-PSS Signatures
//!
//! RSA-PSS over SHA-256 with MGF1-SHA-256 and a salt as long as the digest.
//!
//! ## Invariants
//!
//! - Verification is deterministic and side-effect free.
//! - Malformed keys or signatures verify as `false`; nothing here panics.

use crate::domain::errors::SignatureError;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Modulus size for newly generated bidder keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// SHA-256 of `message`.
#[must_use]
pub fn digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// Generate a fresh key pair.
pub fn generate_keypair(bits: usize) -> Result<(RsaPrivateKey, RsaPublicKey), SignatureError> {
    let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        .map_err(|e| SignatureError::KeyGeneration(e.to_string()))?;
    let public_key = private_key.to_public_key();
    Ok((private_key, public_key))
}

/// Sign `message` with RSA-PSS/SHA-256.
pub fn sign(private_key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    private_key
        .sign_with_rng(&mut rand::thread_rng(), Pss::new::<Sha256>(), &digest(message))
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))
}

/// Verify an RSA-PSS/SHA-256 signature over `message`.
#[must_use]
pub fn verify(public_key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
    public_key
        .verify(Pss::new::<Sha256>(), &digest(message), signature)
        .is_ok()
}

/// Parse a stored public key.
///
/// Accepts SubjectPublicKeyInfo PEM, PKCS#1 PEM, or SubjectPublicKeyInfo DER.
pub fn parse_public_key(bytes: &[u8]) -> Result<RsaPublicKey, SignatureError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        let text = text.trim();
        if text.starts_with("-----BEGIN") {
            return RsaPublicKey::from_public_key_pem(text)
                .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
                .map_err(|e| SignatureError::InvalidKey(e.to_string()));
        }
    }

    RsaPublicKey::from_public_key_der(bytes).map_err(|e| SignatureError::InvalidKey(e.to_string()))
}

/// Encode a public key as SubjectPublicKeyInfo PEM.
pub fn encode_public_key_pem(public_key: &RsaPublicKey) -> Result<String, SignatureError> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))
}

/// Encode a private key as PKCS#8 PEM.
pub fn encode_private_key_pem(private_key: &RsaPrivateKey) -> Result<String, SignatureError> {
    private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))
}

/// Parse a PKCS#8 PEM private key.
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, SignatureError> {
    RsaPrivateKey::from_pkcs8_pem(pem.trim()).map_err(|e| SignatureError::InvalidKey(e.to_string()))
}
