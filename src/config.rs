//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.
//! Every knob has a default; values that fail to parse fall back to it.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Rate limiter parameters.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admissions allowed per client per window
    pub limit: u32,
    /// Length of one counting window
    pub window: Duration,
    /// Honour `X-Real-Ip` / `X-Forwarded-For` when deriving client identity.
    ///
    /// Both headers are client-controlled unless a trusted edge proxy strips
    /// and rewrites them. Disable this when the service is directly exposed.
    pub trust_proxy_headers: bool,
    /// How often stale client windows are purged
    pub purge_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(3600),
            trust_proxy_headers: true,
            purge_interval: Duration::from_secs(300),
        }
    }
}

/// Metadata cache parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the local cache can hold
    pub max_entries: usize,
    /// TTL for entries populated after a read miss
    pub read_ttl: Duration,
    /// TTL for entries written right after a metadata mutation
    pub write_ttl: Duration,
    /// Local cache TTL purge interval
    pub cleanup_interval: Duration,
    /// Deadline applied to every cache backend and store call
    pub backend_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            read_ttl: Duration::from_secs(24 * 3600),
            write_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
            backend_timeout: Duration::from_millis(2000),
        }
    }
}

/// Expiration sweeper parameters.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweep passes
    pub interval: Duration,
    /// Records older than this are swept
    pub retention: Duration,
    /// Candidates fetched per store page
    pub page_size: usize,
    /// Attempts at the blob delete call before giving up on a candidate
    pub delete_attempts: u32,
    /// Existence polls after delete before giving up on a candidate
    pub confirm_attempts: u32,
    /// Delay before the first existence poll, doubled per attempt
    pub confirm_backoff: Duration,
    /// Upper bound on the poll delay
    pub confirm_max_backoff: Duration,
    /// Total time one candidate may take across all steps
    pub candidate_budget: Duration,
    /// Deadline applied to each individual backend call
    pub backend_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            retention: Duration::from_secs(300),
            page_size: 100,
            delete_attempts: 3,
            confirm_attempts: 20,
            confirm_backoff: Duration::from_millis(100),
            confirm_max_backoff: Duration::from_secs(5),
            candidate_budget: Duration::from_secs(60),
            backend_timeout: Duration::from_millis(2000),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub sweep: SweepConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `RATE_LIMIT_REQUESTS` - Admissions per window (default: 100)
    /// - `RATE_LIMIT_WINDOW_SECS` - Window length (default: 3600)
    /// - `RATE_LIMIT_TRUST_PROXY_HEADERS` - Use forwarding headers (default: true)
    /// - `RATE_LIMIT_PURGE_INTERVAL_SECS` - Stale window purge period (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Local cache capacity (default: 10000)
    /// - `CACHE_READ_TTL_SECS` - TTL after a read miss (default: 86400)
    /// - `CACHE_WRITE_TTL_SECS` - TTL after a mutation (default: 300)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Local cache purge period (default: 60)
    /// - `BACKEND_TIMEOUT_MS` - Deadline on every backend call (default: 2000)
    /// - `SWEEP_INTERVAL_SECS` - Sweeper period (default: 120)
    /// - `SWEEP_RETENTION_SECS` - Retention window (default: 300)
    /// - `SWEEP_PAGE_SIZE` - Candidates per page (default: 100)
    /// - `SWEEP_DELETE_ATTEMPTS` - Blob delete attempts (default: 3)
    /// - `SWEEP_CONFIRM_ATTEMPTS` - Existence polls (default: 20)
    /// - `SWEEP_CONFIRM_BACKOFF_MS` - First poll delay (default: 100)
    /// - `SWEEP_CONFIRM_MAX_BACKOFF_MS` - Poll delay cap (default: 5000)
    /// - `SWEEP_CANDIDATE_BUDGET_SECS` - Per-candidate budget (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backend_timeout = Duration::from_millis(env_or(
            "BACKEND_TIMEOUT_MS",
            defaults.cache.backend_timeout.as_millis() as u64,
        ));

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            rate_limit: RateLimitConfig {
                limit: env_or("RATE_LIMIT_REQUESTS", defaults.rate_limit.limit),
                window: secs_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window),
                trust_proxy_headers: env_or(
                    "RATE_LIMIT_TRUST_PROXY_HEADERS",
                    defaults.rate_limit.trust_proxy_headers,
                ),
                purge_interval: secs_or(
                    "RATE_LIMIT_PURGE_INTERVAL_SECS",
                    defaults.rate_limit.purge_interval,
                ),
            },
            cache: CacheConfig {
                max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache.max_entries),
                read_ttl: secs_or("CACHE_READ_TTL_SECS", defaults.cache.read_ttl),
                write_ttl: secs_or("CACHE_WRITE_TTL_SECS", defaults.cache.write_ttl),
                cleanup_interval: secs_or(
                    "CACHE_CLEANUP_INTERVAL_SECS",
                    defaults.cache.cleanup_interval,
                ),
                backend_timeout,
            },
            sweep: SweepConfig {
                interval: secs_or("SWEEP_INTERVAL_SECS", defaults.sweep.interval),
                retention: secs_or("SWEEP_RETENTION_SECS", defaults.sweep.retention),
                page_size: env_or("SWEEP_PAGE_SIZE", defaults.sweep.page_size).max(1),
                delete_attempts: env_or("SWEEP_DELETE_ATTEMPTS", defaults.sweep.delete_attempts)
                    .max(1),
                confirm_attempts: env_or(
                    "SWEEP_CONFIRM_ATTEMPTS",
                    defaults.sweep.confirm_attempts,
                )
                .max(1),
                confirm_backoff: millis_or(
                    "SWEEP_CONFIRM_BACKOFF_MS",
                    defaults.sweep.confirm_backoff,
                ),
                confirm_max_backoff: millis_or(
                    "SWEEP_CONFIRM_MAX_BACKOFF_MS",
                    defaults.sweep.confirm_max_backoff,
                ),
                candidate_budget: secs_or(
                    "SWEEP_CANDIDATE_BUDGET_SECS",
                    defaults.sweep.candidate_budget,
                ),
                backend_timeout,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn secs_or(name: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(name, default.as_secs()))
}

fn millis_or(name: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(name, default.as_millis() as u64))
}
