use super::CacheBackend;
use async_trait::async_trait;
use std::hash::Hash;
use std::marker::PhantomData;

/// A cache that never stores anything, used when caching is disabled.
#[derive(Clone, Default)]
pub struct NullCache<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> NullCache<K, V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<K, V> CacheBackend<K, V> for NullCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, _key: &K) -> Option<V> {
        None
    }

    async fn insert(&self, _key: K, _value: V) {}

    fn remove_if(&self, _predicate: Box<dyn Fn(&K) -> bool + Send + Sync>) {}

    fn clear(&self) {}
}
