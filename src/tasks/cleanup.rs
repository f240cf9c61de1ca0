//! Cleanup Tasks
//!
//! Housekeeping for the in-process state: expired local cache entries and
//! rate windows of clients that went quiet.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::LocalCacheBackend;
use crate::ratelimit::RateLimiter;

/// Spawns a task that drops expired local cache entries every `interval`.
pub fn spawn_cache_cleanup_task(
    cache: Arc<LocalCacheBackend>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache TTL cleanup task every {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

/// Spawns a task that forgets idle rate windows every `interval`.
///
/// Without it the client table grows with every address ever seen.
pub fn spawn_rate_window_purge_task(limiter: RateLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting rate window purge task every {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = limiter.purge_stale();
            if removed > 0 {
                info!(
                    removed,
                    tracked = limiter.tracked_clients(),
                    "purged idle rate windows"
                );
            } else {
                debug!("rate window purge: nothing idle");
            }
        }
    })
}
