//! # Identity Verifier
//!
//! Confirms that a claimed bidder owns the signature on a bid.
//!
//! Public keys are resolved through the [`KeyRegistry`] port and cached
//! forever once found: identities never rotate keys. Misses are not cached,
//! so a bidder registered later becomes visible on the next bid. The
//! registry lookup is bounded by a timeout and never runs under a registry
//! lock.

use crate::domain::errors::VerifierError;
use crate::domain::signature;
use crate::ports::outbound::KeyRegistry;
use dashmap::DashMap;
use rsa::RsaPublicKey;
use shared_types::UserId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on a key registry lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Signature checker with a read-mostly public key cache.
pub struct IdentityVerifier<K: KeyRegistry> {
    keys: Arc<K>,
    cache: DashMap<UserId, Arc<RsaPublicKey>>,
    lookup_timeout: Duration,
}

impl<K: KeyRegistry> IdentityVerifier<K> {
    /// Create a verifier with the default lookup timeout.
    pub fn new(keys: Arc<K>) -> Self {
        Self::with_timeout(keys, DEFAULT_LOOKUP_TIMEOUT)
    }

    /// Create a verifier with an explicit lookup timeout.
    pub fn with_timeout(keys: Arc<K>, lookup_timeout: Duration) -> Self {
        Self {
            keys,
            cache: DashMap::new(),
            lookup_timeout,
        }
    }

    /// Whether `signature` over `message` belongs to `user_id`.
    ///
    /// Lookup failures count as `false`; use [`check`](Self::check) to tell
    /// them apart from a genuine mismatch.
    pub async fn verify(&self, user_id: &str, message: &[u8], signature: &[u8]) -> bool {
        match self.check(user_id, message, signature).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(user_id, error = %e, "[arbiter] Identity check unavailable");
                false
            }
        }
    }

    /// Like [`verify`](Self::verify), but reports transient lookup failures.
    ///
    /// An unregistered identity or an unparseable stored key is `Ok(false)`.
    pub async fn check(
        &self,
        user_id: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, VerifierError> {
        match self.public_key(user_id).await? {
            Some(key) => Ok(signature::verify(&key, message, signature)),
            None => Ok(false),
        }
    }

    async fn public_key(&self, user_id: &str) -> Result<Option<Arc<RsaPublicKey>>, VerifierError> {
        if let Some(key) = self.cache.get(user_id) {
            return Ok(Some(Arc::clone(key.value())));
        }

        let lookup = tokio::time::timeout(self.lookup_timeout, self.keys.resolve_public_key(user_id));
        let bytes = match lookup.await {
            Err(_) => {
                return Err(VerifierError::LookupTimeout {
                    user_id: user_id.to_string(),
                    timeout_ms: u64::try_from(self.lookup_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
            Ok(Err(e)) => return Err(VerifierError::Unavailable(e.to_string())),
            Ok(Ok(None)) => {
                debug!(user_id, "[arbiter] Unknown identity");
                return Ok(None);
            }
            Ok(Ok(Some(bytes))) => bytes,
        };

        match signature::parse_public_key(&bytes) {
            Ok(key) => {
                let key = Arc::new(key);
                self.cache.insert(user_id.to_string(), Arc::clone(&key));
                debug!(user_id, "[arbiter] Public key cached");
                Ok(Some(key))
            }
            Err(e) => {
                warn!(user_id, error = %e, "[arbiter] Stored public key is malformed");
                Ok(None)
            }
        }
    }

    /// Number of cached identities.
    #[must_use]
    pub fn cached_identities(&self) -> usize {
        self.cache.len()
    }

    /// The configured lookup bound.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }
}
