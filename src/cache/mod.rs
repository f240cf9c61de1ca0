//! Cache Module
//!
//! Cache-aside layer for file metadata plus the in-process TTL/LRU store
//! that can serve as its backend.

mod entry;
mod local;
mod lru;
mod metadata;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use local::LocalCacheBackend;
pub use lru::LruTracker;
pub use metadata::{cache_key, Lookup, LookupStats, MetadataCache};
pub use stats::CacheStats;
pub use store::CacheStore;
