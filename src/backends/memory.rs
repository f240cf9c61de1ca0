//! In-memory backends
//!
//! Process-local implementations of the metadata and blob store contracts.
//! They back the bundled binary and the test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{BlobStore, MetadataStore};
use crate::error::{BackendError, BackendResult};
use crate::models::{FileRecord, NewFileRecord, RecordId};

// == Metadata Store ==
/// Ordered map of records with a monotonically increasing id sequence.
#[derive(Debug)]
pub struct MemoryMetadataStore {
    records: RwLock<BTreeMap<RecordId, FileRecord>>,
    next_id: AtomicI64,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Inserts a fully formed record, keeping the id sequence ahead of it.
    pub async fn seed(&self, record: FileRecord) {
        self.next_id.fetch_max(record.id + 1, Ordering::SeqCst);
        self.records.write().await.insert(record.id, record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: NewFileRecord) -> BackendResult<FileRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = FileRecord {
            id,
            owner_id: record.owner_id,
            display_name: record.display_name,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
            storage_key: None,
        };
        self.records.write().await.insert(id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: RecordId) -> BackendResult<Option<FileRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn rename(&self, id: RecordId, display_name: &str) -> BackendResult<Option<FileRecord>> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(&id).map(|record| {
            record.display_name = display_name.to_string();
            record.clone()
        }))
    }

    async fn set_storage_key(
        &self,
        id: RecordId,
        storage_key: &str,
    ) -> BackendResult<Option<FileRecord>> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(&id).map(|record| {
            record.storage_key = Some(storage_key.to_string());
            record.clone()
        }))
    }

    async fn delete(&self, id: RecordId) -> BackendResult<bool> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn list_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<RecordId>,
        limit: usize,
    ) -> BackendResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        let start = after.map_or(RecordId::MIN, |id| id.saturating_add(1));
        Ok(records
            .range(start..)
            .map(|(_, record)| record)
            .filter(|record| record.created_at < cutoff)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        after: Option<RecordId>,
        limit: usize,
    ) -> BackendResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        let start = after.map_or(RecordId::MIN, |id| id.saturating_add(1));
        Ok(records
            .range(start..)
            .map(|(_, record)| record)
            .filter(|record| record.owner_id == owner_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

// == Blob Store ==
/// Map of object keys to bytes.
///
/// With a non-zero `delete_lag`, a deleted object keeps answering `exists`
/// with true for that many checks, like an eventually consistent object
/// store that acknowledges deletes early.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    lingering: RwLock<HashMap<String, u32>>,
    delete_lag: u32,
    delete_calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose deletes become visible after `checks` existence checks.
    pub fn with_delete_lag(checks: u32) -> Self {
        Self {
            delete_lag: checks,
            ..Self::default()
        }
    }

    /// Number of `delete` calls received so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> BackendResult<()> {
        if key.is_empty() {
            return Err(BackendError::Unavailable("empty object key".to_string()));
        }
        self.lingering.write().await.remove(key);
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.objects.write().await.remove(key).is_some() && self.delete_lag > 0 {
            self.lingering
                .write()
                .await
                .insert(key.to_string(), self.delete_lag);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        if self.objects.read().await.contains_key(key) {
            return Ok(true);
        }
        let mut lingering = self.lingering.write().await;
        match lingering.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                if *remaining == 0 {
                    lingering.remove(key);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
