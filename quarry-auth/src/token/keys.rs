//! Per-subject signing key storage and resolution.

use crate::stores::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of generated signing keys in bytes.
pub const KEY_LENGTH: usize = 64;

/// A per-subject HMAC signing key. Created lazily on the first signing or
/// verification request for a subject and never rotated automatically.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureKey {
    bytes: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl SecureKey {
    /// Generates a new random key from a cryptographically secure RNG.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let bytes: Vec<u8> = (0..KEY_LENGTH).map(|_| rng.gen()).collect();
        Self {
            bytes,
            created_at: Utc::now(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// A short hash of the key material, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        let hex = format!("{digest:x}");
        hex[..12].to_string()
    }
}

// never expose key material through Debug output
impl fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureKey")
            .field("fingerprint", &self.fingerprint())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Durable per-subject key storage.
///
/// `store_if_absent` must be atomic per subject: when two callers race to
/// create the first key for a subject, both must end up with the same key,
/// and the loser's candidate is discarded.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, subject: &str) -> Result<Option<SecureKey>, StoreError>;

    /// Stores the key unless one already exists and returns the winner.
    async fn store_if_absent(&self, subject: &str, key: SecureKey)
        -> Result<SecureKey, StoreError>;
}

/// Process-local [`KeyStore`] backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: DashMap<String, SecureKey>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get(&self, subject: &str) -> Result<Option<SecureKey>, StoreError> {
        Ok(self.keys.get(subject).map(|entry| entry.clone()))
    }

    async fn store_if_absent(
        &self,
        subject: &str,
        key: SecureKey,
    ) -> Result<SecureKey, StoreError> {
        // the entry lock makes first-use creation atomic per subject
        let entry = self.keys.entry(subject.to_string()).or_insert(key);
        Ok(entry.clone())
    }
}

/// Resolves the signing key for a subject, generating and persisting a new
/// one on first use.
#[derive(Clone)]
pub struct SecureKeyResolver {
    store: std::sync::Arc<dyn KeyStore>,
}

impl SecureKeyResolver {
    pub fn new(store: std::sync::Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, subject: &str) -> Result<SecureKey, StoreError> {
        if let Some(key) = self.store.get(subject).await? {
            return Ok(key);
        }

        let candidate = SecureKey::generate();
        let key = self.store.store_if_absent(subject, candidate).await?;
        debug!(
            "resolved signing key {} for subject {}",
            key.fingerprint(),
            subject
        );
        Ok(key)
    }
}
