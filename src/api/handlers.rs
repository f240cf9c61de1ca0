//! API Handlers
//!
//! HTTP request handlers for the file endpoints, stats and health.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::LocalCacheBackend;
use crate::error::{Result, ServiceError};
use crate::files::FileService;
use crate::models::{
    FileListResponse, FileResponse, HealthResponse, ListFilesQuery, NewFileRecord, RecordId,
    RenameRequest, RenameResponse, StatsResponse, UploadRequest, UploadResponse,
};
use crate::ratelimit::RateLimiter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FileService>,
    pub limiter: RateLimiter,
    /// Whether client identity may come from proxy headers
    pub trust_proxy_headers: bool,
    /// Set when the cache runs in-process, for eviction and size stats
    pub local_cache: Option<Arc<LocalCacheBackend>>,
}

impl AppState {
    pub fn new(files: Arc<FileService>, limiter: RateLimiter, trust_proxy_headers: bool) -> Self {
        Self {
            files,
            limiter,
            trust_proxy_headers,
            local_cache: None,
        }
    }

    pub fn with_local_cache(mut self, cache: Arc<LocalCacheBackend>) -> Self {
        self.local_cache = Some(cache);
        self
    }
}

/// Handler for POST /files
pub async fn upload_handler(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ServiceError::InvalidRequest(error_msg));
    }

    let content = req.content.into_bytes();
    let new = NewFileRecord::new(req.owner_id, req.display_name, content.len() as u64);
    let record = state.files.upload(new, content).await?;

    Ok((StatusCode::CREATED, Json(UploadResponse::from(&record))))
}

/// Handler for GET /files?owner_id=&after=&limit=
///
/// Reads the store directly; listings never touch the cache.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>> {
    let page_size = query.page_size();
    let records = state
        .files
        .list(query.owner_id, query.after, page_size)
        .await?;
    Ok(Json(FileListResponse::new(query.owner_id, records, page_size)))
}

/// Handler for GET /files/:id
///
/// Cache-aside: a miss loads from the store and repopulates the cache.
pub async fn get_file_handler(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<FileResponse>> {
    let lookup = state.files.share(id).await?;
    Ok(Json(FileResponse::new(id, lookup.metadata, lookup.from_cache)))
}

/// Handler for POST /files/:id/rename
pub async fn rename_handler(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ServiceError::InvalidRequest(error_msg));
    }

    let record = state.files.rename(id, &req.display_name).await?;
    Ok(Json(RenameResponse::new(id, record.display_name)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let lookups = state.files.cache().stats();
    let (evictions, total_entries) = match &state.local_cache {
        Some(cache) => {
            let stats = cache.stats().await;
            (stats.evictions, stats.total_entries)
        }
        None => (0, 0),
    };

    Json(StatsResponse::new(
        lookups.hits,
        lookups.misses,
        lookups.degraded,
        evictions,
        total_entries,
        state.limiter.tracked_clients(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
