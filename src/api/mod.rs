//! API Module
//!
//! HTTP surface over the file service.
//!
//! # Endpoints
//! - `POST /files` - Upload a file (rate limited)
//! - `GET /files?owner_id=` - Page through an owner's files (rate limited)
//! - `GET /files/:id` - Share lookup through the metadata cache (rate limited)
//! - `POST /files/:id/rename` - Rename a file (rate limited)
//! - `GET /stats` - Cache and rate limiter statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::rate_limit;
pub use routes::create_router;
