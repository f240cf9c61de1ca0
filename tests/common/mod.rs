//! Shared fixtures for integration tests
//!
//! Fault-injecting wrappers around the in-memory backends plus helpers that
//! assemble a full service stack.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use file_meta_core::backends::{
    BlobStore, CacheBackend, MemoryBlobStore, MemoryMetadataStore, MetadataStore,
};
use file_meta_core::cache::LocalCacheBackend;
use file_meta_core::config::{CacheConfig, SweepConfig};
use file_meta_core::error::{BackendError, BackendResult};
use file_meta_core::models::{FileRecord, NewFileRecord, RecordId};
use file_meta_core::{ExpirationSweeper, FileService, MetadataCache};

// == Faulty Blob Store ==
/// Blob store that can reject or stall calls for chosen keys.
#[derive(Default)]
pub struct FaultyBlobStore {
    pub inner: MemoryBlobStore,
    /// Keys whose deletes always fail
    broken_keys: Mutex<HashSet<String>>,
    /// Keys whose calls never return
    hung_keys: Mutex<HashSet<String>>,
    /// Deletes to fail before letting one through
    transient_delete_failures: AtomicU32,
    /// Puts store the object, then never acknowledge it
    late_puts: AtomicBool,
}

impl FaultyBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn break_key(&self, key: &str) {
        self.broken_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn hang_key(&self, key: &str) {
        self.hung_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_next_deletes(&self, count: u32) {
        self.transient_delete_failures.store(count, Ordering::SeqCst);
    }

    pub fn acknowledge_puts_late(&self, late: bool) {
        self.late_puts.store(late, Ordering::SeqCst);
    }

    fn is_hung(&self, key: &str) -> bool {
        self.hung_keys.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> BackendResult<()> {
        self.inner.put(key, data).await?;
        if self.late_puts.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        if self.is_hung(key) {
            std::future::pending::<()>().await;
        }
        if self.broken_keys.lock().unwrap().contains(key) {
            return Err(BackendError::Unavailable(format!("access denied for {}", key)));
        }
        let pending = self.transient_delete_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_delete_failures
                .store(pending - 1, Ordering::SeqCst);
            return Err(BackendError::Unavailable("connection reset".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        if self.is_hung(key) {
            std::future::pending::<()>().await;
        }
        self.inner.exists(key).await
    }
}

// == Link Failing Store ==
/// Metadata store whose `set_storage_key` can be made to fail.
pub struct LinkFailingStore {
    pub inner: Arc<MemoryMetadataStore>,
    fail_links: AtomicBool,
}

impl LinkFailingStore {
    pub fn new(inner: Arc<MemoryMetadataStore>) -> Self {
        Self {
            inner,
            fail_links: AtomicBool::new(false),
        }
    }

    pub fn fail_links(&self, fail: bool) {
        self.fail_links.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataStore for LinkFailingStore {
    async fn insert(&self, record: NewFileRecord) -> BackendResult<FileRecord> {
        self.inner.insert(record).await
    }

    async fn get(&self, id: RecordId) -> BackendResult<Option<FileRecord>> {
        self.inner.get(id).await
    }

    async fn rename(&self, id: RecordId, display_name: &str) -> BackendResult<Option<FileRecord>> {
        self.inner.rename(id, display_name).await
    }

    async fn set_storage_key(
        &self,
        id: RecordId,
        storage_key: &str,
    ) -> BackendResult<Option<FileRecord>> {
        if self.fail_links.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("primary lost".to_string()));
        }
        self.inner.set_storage_key(id, storage_key).await
    }

    async fn delete(&self, id: RecordId) -> BackendResult<bool> {
        self.inner.delete(id).await
    }

    async fn list_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<RecordId>,
        limit: usize,
    ) -> BackendResult<Vec<FileRecord>> {
        self.inner.list_created_before(cutoff, after, limit).await
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        after: Option<RecordId>,
        limit: usize,
    ) -> BackendResult<Vec<FileRecord>> {
        self.inner.list_by_owner(owner_id, after, limit).await
    }
}

// == Switchable Cache ==
/// Local cache backend that can be taken offline.
pub struct SwitchableCache {
    pub inner: LocalCacheBackend,
    down: AtomicBool,
}

impl SwitchableCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: LocalCacheBackend::new(max_entries),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> BackendResult<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("cache offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for SwitchableCache {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> BackendResult<()> {
        self.check()?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.check()?;
        self.inner.delete(key).await
    }
}

// == Fixtures ==
pub fn sweep_config() -> SweepConfig {
    SweepConfig {
        retention: Duration::from_secs(20 * 60),
        page_size: 10,
        confirm_backoff: Duration::from_millis(10),
        confirm_max_backoff: Duration::from_millis(100),
        backend_timeout: Duration::from_millis(500),
        ..SweepConfig::default()
    }
}

pub struct SweepHarness {
    pub store: Arc<MemoryMetadataStore>,
    pub blobs: Arc<FaultyBlobStore>,
    pub cache_backend: Arc<SwitchableCache>,
    pub cache: Arc<MetadataCache>,
    pub sweeper: ExpirationSweeper,
}

impl SweepHarness {
    pub fn new(config: SweepConfig) -> Self {
        let store = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(FaultyBlobStore::new());
        let cache_backend = Arc::new(SwitchableCache::new(100));
        let cache = Arc::new(MetadataCache::new(
            cache_backend.clone(),
            store.clone(),
            &CacheConfig::default(),
        ));
        let sweeper =
            ExpirationSweeper::new(store.clone(), blobs.clone(), cache.clone(), config);
        Self {
            store,
            blobs,
            cache_backend,
            cache,
            sweeper,
        }
    }

    /// A file service over the harness blobs and a link-failing view of its store.
    pub fn file_service(&self) -> (FileService, Arc<LinkFailingStore>) {
        let store = Arc::new(LinkFailingStore::new(self.store.clone()));
        let files = FileService::new(
            store.clone(),
            self.blobs.clone(),
            self.cache.clone(),
            Duration::from_millis(500),
        );
        (files, store)
    }

    /// Creates an uploaded record `minutes_old` minutes in the past.
    pub async fn uploaded(&self, name: &str, minutes_old: i64) -> FileRecord {
        let created = Utc::now() - TimeDelta::minutes(minutes_old);
        let record = self
            .store
            .insert(NewFileRecord::new(1, name, 4).created_at(created))
            .await
            .unwrap();
        let key = format!("blob-{}", name);
        self.blobs.put(&key, vec![0; 4]).await.unwrap();
        self.store
            .set_storage_key(record.id, &key)
            .await
            .unwrap()
            .unwrap()
    }
}
