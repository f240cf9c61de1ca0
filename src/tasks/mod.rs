//! Background Tasks Module
//!
//! Periodic work that runs beside request handling:
//! - local cache TTL cleanup
//! - idle rate-window purge
//! - expiration sweep
//!
//! Every spawner returns the task's `JoinHandle` so shutdown can abort it.

mod cleanup;
mod sweep;

pub use cleanup::{spawn_cache_cleanup_task, spawn_rate_window_purge_task};
pub use sweep::spawn_sweeper_task;
