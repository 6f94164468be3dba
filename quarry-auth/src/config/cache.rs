use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStore {
    InMemory,
    #[serde(other)]
    None,
}

impl Default for CacheStore {
    fn default() -> Self {
        CacheStore::InMemory
    }
}

fn default_capacity() -> u64 {
    1000
}

/// Authorization cache configuration.
///
/// Entries are evicted by mutation events, so no TTL is applied; capacity
/// only bounds memory for deployments with very many principals.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Cache store type: "in-memory" (default) or "none"
    #[serde(default)]
    pub store: CacheStore,

    /// Maximum number of cached authorization entries (default: 1000)
    #[serde(default = "default_capacity")]
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: CacheStore::default(),
            capacity: default_capacity(),
        }
    }
}
