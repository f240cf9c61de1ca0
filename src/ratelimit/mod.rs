//! Per-client rate limiting.
//!
//! Each client identity owns a `RateWindow` holding a request count and the
//! instant its window opened. When a window is older than the configured
//! duration it is reset wholesale, so a client can burst up to twice the
//! limit across a boundary. This is a fairness control, not a security
//! boundary, and the state is lost on restart.
//!
//! Windows live in a `DashMap`, so an admission locks only its own shard
//! entry and concurrent requests from one client never lose an increment.

mod identity;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

pub use identity::{client_identity, FORWARDED_FOR_HEADER, REAL_IP_HEADER};

/// Counter state for one client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }

    fn try_admit(&mut self, now: Instant, limit: u32, window: Duration) -> bool {
        if self.is_stale(now, window) {
            self.count = 0;
            self.window_start = now;
        }
        if self.count >= limit {
            return false;
        }
        self.count += 1;
        true
    }
}

struct RateLimiterInner {
    windows: DashMap<String, RateWindow>,
    limit: u32,
    window: Duration,
}

/// Shared handle; clones refer to the same client table.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                windows: DashMap::new(),
                limit,
                window,
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, config.window)
    }

    /// Admits or rejects one request from `identity`.
    ///
    /// A rejection leaves the counter untouched.
    pub fn admit(&self, identity: &str) -> bool {
        let now = Instant::now();
        let inner = &*self.inner;

        if let Some(mut window) = inner.windows.get_mut(identity) {
            return window.try_admit(now, inner.limit, inner.window);
        }
        inner
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| RateWindow::new(now))
            .try_admit(now, inner.limit, inner.window)
    }

    /// Time until `identity`'s current window resets, if it has one.
    pub fn retry_after(&self, identity: &str) -> Option<Duration> {
        let window = self.window(identity)?;
        let elapsed = Instant::now().saturating_duration_since(window.window_start);
        Some(self.inner.window.saturating_sub(elapsed))
    }

    /// Current window for `identity`.
    pub fn window(&self, identity: &str) -> Option<RateWindow> {
        self.inner.windows.get(identity).map(|window| *window)
    }

    /// Removes windows that have been idle for longer than the window
    /// duration and returns how many were dropped. A purged client starts
    /// over with a fresh window, exactly as a reset would give it.
    pub fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let window = self.inner.window;
        let mut removed = 0;
        self.inner.windows.retain(|_, entry| {
            let keep = !entry.is_stale(now, window);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of client identities currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.inner.windows.len()
    }

    pub fn limit(&self) -> u32 {
        self.inner.limit
    }
}
