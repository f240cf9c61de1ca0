//! Cache Entry Module
//!
//! A single cached value with the instant it was written and its TTL.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// When the entry was written
    pub inserted_at: Instant,
    /// How long the entry stays valid after `inserted_at`
    pub ttl: Duration,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current instant.
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    /// Time since the entry was written.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once its age reaches the TTL, so a zero TTL is
    /// expired immediately. Works from elapsed time so a huge TTL cannot
    /// overflow the clock.
    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }
}
