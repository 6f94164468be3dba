use super::CacheBackend;
use async_trait::async_trait;
use log::warn;
use moka::future::Cache as MokaCache;
use std::hash::Hash;

#[derive(Clone)]
pub struct InMemoryCache<K, V> {
    cache: MokaCache<K, V>,
}

impl<K, V> InMemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Initialize a new in-memory cache instance. Capacity is a maximum
    /// entry count; entries live until evicted by `remove_if`/`clear` or by
    /// capacity pressure.
    pub fn new(capacity: u64) -> Result<Self, String> {
        if capacity == 0 {
            return Err("cache capacity must be greater than zero".to_string());
        }

        let cache = MokaCache::builder()
            .max_capacity(capacity)
            .support_invalidation_closures()
            .build();

        Ok(Self { cache })
    }
}

#[async_trait]
impl<K, V> CacheBackend<K, V> for InMemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).await
    }

    async fn insert(&self, key: K, value: V) {
        self.cache.insert(key, value).await;
    }

    fn remove_if(&self, predicate: Box<dyn Fn(&K) -> bool + Send + Sync>) {
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _value| predicate(key))
        {
            warn!("failed to apply cache invalidation predicate: {e}");
        }
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}
