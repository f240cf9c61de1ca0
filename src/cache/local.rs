//! Local cache backend
//!
//! Adapts the in-process `CacheStore` to the `CacheBackend` contract so the
//! metadata cache can run without an external cache server.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backends::CacheBackend;
use crate::cache::{CacheStats, CacheStore};
use crate::error::BackendResult;

/// `CacheStore` behind an async lock.
#[derive(Debug)]
pub struct LocalCacheBackend {
    store: RwLock<CacheStore>,
}

impl LocalCacheBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: RwLock::new(CacheStore::new(max_entries)),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Drops every expired entry, returning the count removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for LocalCacheBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        // Write lock: lookups update LRU order and counters
        Ok(self.store.write().await.get(key))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> BackendResult<()> {
        self.store.write().await.set(key.to_string(), value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.store.write().await.delete(key);
        Ok(())
    }
}
