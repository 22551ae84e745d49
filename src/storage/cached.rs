use std::sync::Arc;

use async_trait::async_trait;

use super::{ContentStore, ObjectMetadata, StorageResult};
use crate::cache::Cache;

/// Read-through caching decorator for any [`ContentStore`].
///
/// Document reads are cached by key. Writes and deletes invalidate the key;
/// listings and metadata always go to the inner store.
pub struct CachedStore<S> {
    inner: S,
    cache: Arc<dyn Cache<String>>,
}

impl<S: ContentStore> CachedStore<S> {
    pub fn new(inner: S, cache: Arc<dyn Cache<String>>) -> Self {
        Self { inner, cache }
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl<S: ContentStore> ContentStore for CachedStore<S> {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        if self.cache.get(key).is_some() {
            return Ok(true);
        }
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> StorageResult<String> {
        if let Some(content) = self.cache.get(key) {
            tracing::debug!("Cache hit for '{}'", key);
            return Ok(content);
        }

        let content = self.inner.read(key).await?;
        self.cache.set(key, content.clone());
        Ok(content)
    }

    async fn write(&self, key: &str, content: &str) -> StorageResult<()> {
        let result = self.inner.write(key, content).await;
        self.cache.delete(key);
        result
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let result = self.inner.delete(key).await;
        self.cache.delete(key);
        result
    }

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        self.inner.metadata(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::LocalStore;

    #[tokio::test]
    async fn serves_reads_from_cache_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStore::new(dir.path());
        local.write("c.md", "v1").await.unwrap();

        let store = CachedStore::new(local.clone(), Arc::new(MemoryCache::new()));
        assert_eq!(store.read("c.md").await.unwrap(), "v1");

        // Change behind the cache's back: the cached copy still wins.
        local.write("c.md", "v2").await.unwrap();
        assert_eq!(store.read("c.md").await.unwrap(), "v1");

        store.invalidate_all();
        assert_eq!(store.read("c.md").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn writes_through_and_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let store = CachedStore::new(LocalStore::new(dir.path()), Arc::new(MemoryCache::new()));

        store.write("c.md", "v1").await.unwrap();
        assert_eq!(store.read("c.md").await.unwrap(), "v1");
        store.write("c.md", "v2").await.unwrap();
        assert_eq!(store.read("c.md").await.unwrap(), "v2");

        store.delete("c.md").await.unwrap();
        assert!(!store.exists("c.md").await.unwrap());
    }
}
