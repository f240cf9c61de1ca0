//! Metadata Cache
//!
//! Cache-aside front for the metadata store. Reads check the cache backend
//! first and fall through to the store on a miss, repopulating with the long
//! read TTL. Writers update the store first and then call `set`/`write_through`
//! or `invalidate`; the cache always trails the store.
//!
//! The cache backend is an optimization only. When it fails, lookups behave
//! as misses and writes to it are skipped with a warning. Only store failures
//! reach the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::backends::{CacheBackend, MetadataStore};
use crate::config::CacheConfig;
use crate::error::{with_deadline, Result, ServiceError};
use crate::models::{FileMetadata, FileRecord, RecordId};

/// Number of write-generation slots; record ids hash onto them.
const GENERATION_SLOTS: usize = 256;

/// Cache key for a record.
pub fn cache_key(id: RecordId) -> String {
    format!("file_{}", id)
}

/// Outcome of a lookup, noting where the answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub metadata: FileMetadata,
    pub from_cache: bool,
}

/// Lookup counters, readable without locking.
#[derive(Debug, Default)]
struct LookupCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
}

/// Snapshot of the lookup counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    /// Cache backend calls that failed and were bypassed
    pub degraded: u64,
}

impl LookupStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Metadata Cache ==
pub struct MetadataCache {
    backend: Arc<dyn CacheBackend>,
    store: Arc<dyn MetadataStore>,
    read_ttl: Duration,
    write_ttl: Duration,
    timeout: Duration,
    /// Bumped by every `set`/`invalidate`. A read-miss population that sees
    /// its slot move while it was loading removes what it wrote, so a value
    /// loaded before a write cannot outlive that write in this process.
    generations: Box<[AtomicU64]>,
    counters: LookupCounters,
}

impl MetadataCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        store: Arc<dyn MetadataStore>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            backend,
            store,
            read_ttl: config.read_ttl,
            write_ttl: config.write_ttl,
            timeout: config.backend_timeout,
            generations: (0..GENERATION_SLOTS).map(|_| AtomicU64::new(0)).collect(),
            counters: LookupCounters::default(),
        }
    }

    /// TTL used for entries written right after a mutation.
    pub fn write_ttl(&self) -> Duration {
        self.write_ttl
    }

    // == Get ==
    /// Returns the record's metadata, from cache when possible.
    ///
    /// Errors with `NotFound` when the store has no such record and with
    /// `StoreUnavailable` when the store cannot be read.
    pub async fn get(&self, id: RecordId) -> Result<FileMetadata> {
        self.lookup(id).await.map(|lookup| lookup.metadata)
    }

    /// Same as `get`, also reporting whether the cache answered.
    pub async fn lookup(&self, id: RecordId) -> Result<Lookup> {
        let key = cache_key(id);

        let backend_ok = match with_deadline(self.timeout, self.backend.get(&key)).await {
            Ok(Some(raw)) => match serde_json::from_str::<FileMetadata>(&raw) {
                Ok(metadata) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(record_id = id, "metadata cache hit");
                    return Ok(Lookup {
                        metadata,
                        from_cache: true,
                    });
                }
                Err(err) => {
                    warn!(record_id = id, error = %err, "discarding undecodable cache entry");
                    true
                }
            },
            Ok(None) => true,
            Err(err) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(record_id = id, error = %err, "cache backend unavailable, reading through");
                false
            }
        };

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(record_id = id, "metadata cache miss");

        let generation = self.slot(id).load(Ordering::Acquire);
        let record = with_deadline(self.timeout, self.store.get(id))
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        let metadata = FileMetadata::from(&record);

        if backend_ok {
            self.populate(id, &key, &metadata, generation).await;
        }

        Ok(Lookup {
            metadata,
            from_cache: false,
        })
    }

    async fn populate(&self, id: RecordId, key: &str, metadata: &FileMetadata, generation: u64) {
        if !self.put(key, metadata, self.read_ttl).await {
            return;
        }
        if self.slot(id).load(Ordering::Acquire) != generation {
            debug!(record_id = id, "populate raced with a write, dropping entry");
            self.remove(key).await;
        }
    }

    // == Set ==
    /// Overwrites the cached value for `id`.
    ///
    /// Call only after the store write this value reflects has completed.
    pub async fn set(&self, id: RecordId, metadata: &FileMetadata, ttl: Duration) {
        self.slot(id).fetch_add(1, Ordering::AcqRel);
        if self.put(&cache_key(id), metadata, ttl).await {
            debug!(record_id = id, ttl_secs = ttl.as_secs(), "metadata cached");
        }
    }

    /// Caches a just-mutated record with the short write TTL.
    pub async fn write_through(&self, record: &FileRecord) {
        self.set(record.id, &FileMetadata::from(record), self.write_ttl)
            .await;
    }

    // == Invalidate ==
    /// Removes the cached value; the next `get` reloads from the store.
    pub async fn invalidate(&self, id: RecordId) {
        self.slot(id).fetch_add(1, Ordering::AcqRel);
        self.remove(&cache_key(id)).await;
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, id: RecordId) -> &AtomicU64 {
        &self.generations[(id as u64 % GENERATION_SLOTS as u64) as usize]
    }

    async fn put(&self, key: &str, metadata: &FileMetadata, ttl: Duration) -> bool {
        let raw = match serde_json::to_string(metadata) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "failed to encode metadata for cache");
                return false;
            }
        };
        match with_deadline(self.timeout, self.backend.set_with_ttl(key, raw, ttl)).await {
            Ok(()) => true,
            Err(err) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %err, "cache write skipped");
                false
            }
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(err) = with_deadline(self.timeout, self.backend.delete(key)).await {
            self.counters.degraded.fetch_add(1, Ordering::Relaxed);
            warn!(key, error = %err, "cache delete skipped");
        }
    }
}
