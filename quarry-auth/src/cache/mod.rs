use crate::config::{CacheConfig, CacheStore};
use async_trait::async_trait;
use std::hash::Hash;

pub mod memory;
pub mod null;

/// Cache trait defining the interface for all cache implementations.
///
/// Implementations must be thread-safe and cloneable so a cache handle can
/// be shared between the collector and the invalidation listener. Eviction
/// through `remove_if` and `clear` must be visible to all subsequent `get`
/// calls.
#[async_trait]
pub trait CacheBackend<K, V>: Send + Sync
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Retrieve a value from the cache
    async fn get(&self, key: &K) -> Option<V>;

    /// Store a value in the cache
    async fn insert(&self, key: K, value: V);

    /// Drop every entry whose key satisfies the predicate
    fn remove_if(&self, predicate: Box<dyn Fn(&K) -> bool + Send + Sync>);

    /// Drop all entries
    fn clear(&self);
}

/// Cache implementation that provides a uniform interface regardless of
/// backend. The concrete implementation is chosen at runtime based on the
/// cache configuration.
#[derive(Clone)]
pub enum Cache<K, V> {
    /// In-memory cache implementation using Moka
    InMemory(memory::InMemoryCache<K, V>),
    /// No-op cache implementation that doesn't actually cache anything
    Null(null::NullCache<K, V>),
}

#[async_trait]
impl<K, V> CacheBackend<K, V> for Cache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Null(cache) => cache.get(key).await,
        }
    }

    async fn insert(&self, key: K, value: V) {
        match self {
            Self::InMemory(cache) => cache.insert(key, value).await,
            Self::Null(cache) => cache.insert(key, value).await,
        }
    }

    fn remove_if(&self, predicate: Box<dyn Fn(&K) -> bool + Send + Sync>) {
        match self {
            Self::InMemory(cache) => cache.remove_if(predicate),
            Self::Null(cache) => cache.remove_if(predicate),
        }
    }

    fn clear(&self) {
        match self {
            Self::InMemory(cache) => cache.clear(),
            Self::Null(cache) => cache.clear(),
        }
    }
}

/// Factory function to create the appropriate cache implementation based on
/// configuration.
pub fn create_cache<K, V>(config: &CacheConfig) -> Result<Cache<K, V>, String>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    match config.store {
        CacheStore::InMemory => {
            let cache = memory::InMemoryCache::new(config.capacity)?;
            Ok(Cache::InMemory(cache))
        }
        CacheStore::None => Ok(Cache::Null(null::NullCache::new())),
    }
}
