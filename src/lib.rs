//! File metadata core
//!
//! Cache-aside metadata lookups, a retention sweeper that removes expired
//! files from blob storage before their metadata, and per-client rate
//! limiting in front of the file endpoints.

pub mod api;
pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod files;
pub mod models;
pub mod ratelimit;
pub mod sweeper;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::MetadataCache;
pub use config::Config;
pub use error::{BackendError, ServiceError};
pub use files::FileService;
pub use ratelimit::RateLimiter;
pub use sweeper::{ExpirationSweeper, SweepReport, SweepStage};
