//! Backend contracts
//!
//! The core never owns its storage. It talks to three collaborators through
//! these traits, each constructed once by the embedding process and shared
//! as `Arc<dyn _>` by every component.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BackendResult;
use crate::models::{FileRecord, NewFileRecord, RecordId};

pub use memory::{MemoryBlobStore, MemoryMetadataStore};

/// Authoritative store for file records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Inserts a record and returns it with its store-assigned id.
    async fn insert(&self, record: NewFileRecord) -> BackendResult<FileRecord>;

    /// Point lookup. `Ok(None)` means the record does not exist.
    async fn get(&self, id: RecordId) -> BackendResult<Option<FileRecord>>;

    /// Changes the display name; returns the updated record if it exists.
    async fn rename(&self, id: RecordId, display_name: &str) -> BackendResult<Option<FileRecord>>;

    /// Links the record to its uploaded blob.
    async fn set_storage_key(
        &self,
        id: RecordId,
        storage_key: &str,
    ) -> BackendResult<Option<FileRecord>>;

    /// Removes the record. Returns false if it was already gone.
    async fn delete(&self, id: RecordId) -> BackendResult<bool>;

    /// One page of records created strictly before `cutoff`, ordered by id,
    /// starting after `after` when given.
    async fn list_created_before(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<RecordId>,
        limit: usize,
    ) -> BackendResult<Vec<FileRecord>>;

    /// One page of `owner_id`'s records, ordered by id, starting after
    /// `after` when given.
    async fn list_by_owner(
        &self,
        owner_id: i64,
        after: Option<RecordId>,
        limit: usize,
    ) -> BackendResult<Vec<FileRecord>>;
}

/// Durable object storage holding file contents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> BackendResult<()>;

    /// Deletes the object. Implementations may acknowledge before the
    /// object is actually gone; use `exists` to confirm.
    async fn delete(&self, key: &str) -> BackendResult<()>;

    async fn exists(&self, key: &str) -> BackendResult<bool>;
}

/// Key/value cache with per-entry TTL.
///
/// `get` returns `Ok(None)` for an absent key and `Err` only when the
/// backend itself cannot answer.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> BackendResult<()>;

    async fn delete(&self, key: &str) -> BackendResult<()>;
}
