//! # Key Store Adapters
//!
//! Implementations of the [`KeyRegistry`] port.
//!
//! - [`FileKeyRegistry`]: one `<user_id>.pem` file per bidder in a directory,
//!   as written by the bidder tool.
//! - [`InMemoryKeyRegistry`]: a map, for tests and embedded use.

use crate::ports::outbound::{KeyRegistry, KeyRegistryError};
use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::UserId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Longest user id accepted as a file name.
const MAX_USER_ID_LEN: usize = 128;

/// Whether `user_id` can be used verbatim as a file stem.
///
/// Only ASCII letters, digits, `-`, `_` and `.` are allowed, and the id may
/// not start with a dot, so it can never escape the key directory.
#[must_use]
pub fn is_safe_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Public keys stored as PEM files in a directory.
#[derive(Debug, Clone)]
pub struct FileKeyRegistry {
    dir: PathBuf,
}

impl FileKeyRegistry {
    /// Use `dir` as the key directory. It need not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The key directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a bidder's key file, if the id is a safe file name.
    #[must_use]
    pub fn key_path(&self, user_id: &str) -> Option<PathBuf> {
        is_safe_user_id(user_id).then(|| self.dir.join(format!("{user_id}.pem")))
    }

    /// Store a bidder's public key, creating the directory if needed.
    ///
    /// An existing key file is replaced.
    pub async fn register(&self, user_id: &str, pem: &[u8]) -> Result<PathBuf, KeyRegistryError> {
        let path = self
            .key_path(user_id)
            .ok_or_else(|| KeyRegistryError::InvalidUserId(user_id.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, pem).await?;

        info!(user_id, path = %path.display(), "Public key registered");
        Ok(path)
    }
}

#[async_trait]
impl KeyRegistry for FileKeyRegistry {
    async fn resolve_public_key(&self, user_id: &str) -> Result<Option<Vec<u8>>, KeyRegistryError> {
        let Some(path) = self.key_path(user_id) else {
            debug!(user_id, "Unsafe user id, treating as unregistered");
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Public keys held in memory.
#[derive(Debug, Default)]
pub struct InMemoryKeyRegistry {
    keys: DashMap<UserId, Vec<u8>>,
}

impl InMemoryKeyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a key.
    pub fn insert(&self, user_id: impl Into<UserId>, key: Vec<u8>) {
        self.keys.insert(user_id.into(), key);
    }

    /// Number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when no identity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyRegistry for InMemoryKeyRegistry {
    async fn resolve_public_key(&self, user_id: &str) -> Result<Option<Vec<u8>>, KeyRegistryError> {
        Ok(self.keys.get(user_id).map(|key| key.value().clone()))
    }
}
