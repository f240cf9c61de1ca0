//! File Service
//!
//! The mutation flows that sit in front of the metadata cache. Each one
//! writes the metadata store first and only then touches the cache, so a
//! reader that sees the cached value can always find the row behind it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::backends::{BlobStore, MetadataStore};
use crate::cache::{Lookup, MetadataCache};
use crate::error::{with_deadline, Result, ServiceError};
use crate::models::{FileRecord, NewFileRecord, RecordId};

// == File Service ==
pub struct FileService {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    cache: Arc<MetadataCache>,
    timeout: Duration,
}

impl FileService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<MetadataCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            blobs,
            cache,
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    // == Upload ==
    /// Creates the record, stores the content, links the blob key and
    /// caches the finished record.
    ///
    /// If the blob write or the link fails the record is left without a
    /// storage key. The blob, if any landed, sits under the record's
    /// `upload_key`, where the sweeper looks for it once the record passes
    /// retention.
    pub async fn upload(&self, new: NewFileRecord, content: Vec<u8>) -> Result<FileRecord> {
        let record = with_deadline(self.timeout, self.store.insert(new)).await?;
        let key = record.upload_key();

        if let Err(err) = with_deadline(self.timeout, self.blobs.put(&key, content)).await {
            warn!(record_id = record.id, key = %key, error = %err, "blob upload failed");
            return Err(ServiceError::BlobUnavailable(err.to_string()));
        }

        let linked = with_deadline(self.timeout, self.store.set_storage_key(record.id, &key)).await;
        let record = match linked {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.discard_blob(record.id, &key).await;
                return Err(ServiceError::NotFound(record.id));
            }
            Err(err) => {
                self.discard_blob(record.id, &key).await;
                return Err(err.into());
            }
        };
        self.cache.write_through(&record).await;

        info!(record_id = record.id, key = %key, "file uploaded");
        Ok(record)
    }

    /// Best-effort removal of a blob whose record could not be linked.
    async fn discard_blob(&self, record_id: RecordId, key: &str) {
        match with_deadline(self.timeout, self.blobs.delete(key)).await {
            Ok(()) => warn!(record_id, key, "link failed, uploaded blob discarded"),
            Err(err) => warn!(
                record_id,
                key,
                error = %err,
                "link failed and blob discard failed, leaving it to the sweeper"
            ),
        }
    }

    // == Rename ==
    /// Updates the display name, then overwrites the cache entry with the
    /// short write TTL.
    pub async fn rename(&self, id: RecordId, display_name: &str) -> Result<FileRecord> {
        let record = with_deadline(self.timeout, self.store.rename(id, display_name))
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        self.cache.write_through(&record).await;

        info!(record_id = id, display_name, "file renamed");
        Ok(record)
    }

    // == List ==
    /// One page of an owner's files, read straight from the store.
    pub async fn list(
        &self,
        owner_id: i64,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<FileRecord>> {
        let page =
            with_deadline(self.timeout, self.store.list_by_owner(owner_id, after, limit)).await?;
        Ok(page)
    }

    // == Share ==
    /// Resolves the metadata a share link needs, via the cache.
    pub async fn share(&self, id: RecordId) -> Result<Lookup> {
        self.cache.lookup(id).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryBlobStore, MemoryMetadataStore};
    use crate::cache::LocalCacheBackend;
    use crate::config::CacheConfig;
    use crate::error::{BackendError, BackendResult};
    use async_trait::async_trait;

    struct RejectingBlobs;

    #[async_trait]
    impl BlobStore for RejectingBlobs {
        async fn put(&self, _key: &str, _data: Vec<u8>) -> BackendResult<()> {
            Err(BackendError::Unavailable("bucket offline".into()))
        }
        async fn delete(&self, _key: &str) -> BackendResult<()> {
            Ok(())
        }
        async fn exists(&self, _key: &str) -> BackendResult<bool> {
            Ok(false)
        }
    }

    fn service(
        store: Arc<MemoryMetadataStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> FileService {
        let cache = Arc::new(MetadataCache::new(
            Arc::new(LocalCacheBackend::new(100)),
            store.clone(),
            &CacheConfig::default(),
        ));
        FileService::new(store, blobs, cache, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_upload_links_blob_and_caches() {
        let store = Arc::new(MemoryMetadataStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let files = service(store.clone(), blobs.clone());

        let record = files
            .upload(NewFileRecord::new(7, "notes.txt", 5), b"hello".to_vec())
            .await
            .unwrap();

        let key = record.storage_key.clone().unwrap();
        assert_eq!(key, record.upload_key());
        assert!(blobs.exists(&key).await.unwrap());

        let lookup = files.share(record.id).await.unwrap();
        assert!(lookup.from_cache);
        assert_eq!(lookup.metadata.storage_key, Some(key));
    }

    #[tokio::test]
    async fn test_failed_blob_write_leaves_unlinked_record() {
        let store = Arc::new(MemoryMetadataStore::new());
        let files = service(store.clone(), Arc::new(RejectingBlobs));

        let result = files
            .upload(NewFileRecord::new(7, "notes.txt", 5), b"hello".to_vec())
            .await;

        assert!(matches!(result, Err(ServiceError::BlobUnavailable(_))));
        let orphan = store.get(1).await.unwrap().unwrap();
        assert!(!orphan.is_uploaded());
    }

    #[tokio::test]
    async fn test_rename_is_visible_immediately() {
        let store = Arc::new(MemoryMetadataStore::new());
        let files = service(store.clone(), Arc::new(MemoryBlobStore::new()));
        let record = files
            .upload(NewFileRecord::new(1, "draft.doc", 3), vec![1, 2, 3])
            .await
            .unwrap();
        files.share(record.id).await.unwrap();

        files.rename(record.id, "final.doc").await.unwrap();

        let lookup = files.share(record.id).await.unwrap();
        assert_eq!(lookup.metadata.display_name, "final.doc");
    }

    #[tokio::test]
    async fn test_list_returns_owner_files_from_store() {
        let store = Arc::new(MemoryMetadataStore::new());
        let files = service(store.clone(), Arc::new(MemoryBlobStore::new()));
        for name in ["a.txt", "b.txt", "c.txt"] {
            files
                .upload(NewFileRecord::new(5, name, 1), vec![0])
                .await
                .unwrap();
        }
        files
            .upload(NewFileRecord::new(6, "other.txt", 1), vec![0])
            .await
            .unwrap();
        let lookups_before = files.cache().stats();

        let first = files.list(5, None, 2).await.unwrap();
        let second = files.list(5, Some(first[1].id), 2).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].display_name, "c.txt");
        assert!(second[0].is_uploaded());
        let lookups_after = files.cache().stats();
        assert_eq!(
            lookups_after.hits + lookups_after.misses,
            lookups_before.hits + lookups_before.misses
        );
    }

    #[tokio::test]
    async fn test_rename_missing_record() {
        let store = Arc::new(MemoryMetadataStore::new());
        let files = service(store, Arc::new(MemoryBlobStore::new()));

        assert!(matches!(
            files.rename(404, "x").await,
            Err(ServiceError::NotFound(404))
        ));
    }
}
