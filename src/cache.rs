//! Pluggable key/value caches.
//!
//! Services take an `Arc<dyn Cache<V>>` so the in-process map and the TTL
//! cache are interchangeable.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Default TTL for [`TtlCache`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Maximum entries held by a [`TtlCache`].
const TTL_CACHE_MAX_CAPACITY: u64 = 10_000;

pub trait Cache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V);
    fn delete(&self, key: &str);
    fn clear(&self);
}

/// Unbounded in-process map. Entries live until deleted or cleared.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: V) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(key);
    }

    fn clear(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }
}

/// Time-bounded cache backed by moka.
pub struct TtlCache<V> {
    inner: moka::sync::Cache<String, V>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let inner = moka::sync::Cache::builder()
            .max_capacity(TTL_CACHE_MAX_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Cache<V> for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: V) {
        self.inner.insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.inner.invalidate(key);
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(cache: &dyn Cache<String>) {
        assert!(cache.get("a").is_none());

        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        assert_eq!(cache.get("a").as_deref(), Some("1"));

        cache.delete("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").as_deref(), Some("2"));

        cache.clear();
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn memory_cache_get_set_delete_clear() {
        exercise(&MemoryCache::new());
    }

    #[test]
    fn ttl_cache_get_set_delete_clear() {
        exercise(&TtlCache::new());
    }

    #[test]
    fn ttl_cache_expires_entries() {
        let cache = TtlCache::with_ttl(Duration::from_millis(20));
        cache.set("k", 1u32);
        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("k").is_none());
    }
}
