//! Response DTOs for the service surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FileMetadata, FileRecord, RecordId};

/// Response body for GET /files/:id
#[derive(Debug, Clone, Serialize)]
pub struct FileResponse {
    pub id: RecordId,
    pub display_name: String,
    /// Blob key, absent while the upload is unfinished
    pub storage_key: Option<String>,
    /// Whether the answer was served from the cache
    pub cached: bool,
}

impl FileResponse {
    /// Creates a new FileResponse from a cached or freshly loaded snapshot
    pub fn new(id: RecordId, metadata: FileMetadata, cached: bool) -> Self {
        Self {
            id,
            display_name: metadata.display_name,
            storage_key: metadata.storage_key,
            cached,
        }
    }
}

/// Response body for POST /files/:id/rename
#[derive(Debug, Clone, Serialize)]
pub struct RenameResponse {
    /// Success message
    pub message: String,
    pub id: RecordId,
    pub display_name: String,
}

impl RenameResponse {
    /// Creates a new RenameResponse
    pub fn new(id: RecordId, display_name: impl Into<String>) -> Self {
        Self {
            message: format!("File {} metadata updated successfully", id),
            id,
            display_name: display_name.into(),
        }
    }
}

/// Response body for POST /files
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub id: RecordId,
    pub display_name: String,
    pub storage_key: Option<String>,
    pub size_bytes: u64,
}

impl From<&FileRecord> for UploadResponse {
    fn from(record: &FileRecord) -> Self {
        Self {
            message: "File uploaded successfully".to_string(),
            id: record.id,
            display_name: record.display_name.clone(),
            storage_key: record.storage_key.clone(),
            size_bytes: record.size_bytes,
        }
    }
}

/// One entry of a file listing
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub id: RecordId,
    pub display_name: String,
    pub storage_key: Option<String>,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            display_name: record.display_name,
            storage_key: record.storage_key,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
        }
    }
}

/// Response body for GET /files
#[derive(Debug, Clone, Serialize)]
pub struct FileListResponse {
    pub owner_id: i64,
    pub files: Vec<FileSummary>,
    /// Cursor for the next page; absent on the last page
    pub next_after: Option<RecordId>,
}

impl FileListResponse {
    /// Builds a page; a full page means there may be more.
    pub fn new(owner_id: i64, records: Vec<FileRecord>, page_size: usize) -> Self {
        let next_after = if records.len() >= page_size {
            records.last().map(|record| record.id)
        } else {
            None
        };
        Self {
            owner_id,
            files: records.into_iter().map(FileSummary::from).collect(),
            next_after,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Cache backend failures that were bypassed
    pub degraded: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Client identities currently holding a rate window
    pub tracked_clients: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from lookup and local cache statistics
    pub fn new(
        hits: u64,
        misses: u64,
        degraded: u64,
        evictions: u64,
        total_entries: usize,
        tracked_clients: usize,
    ) -> Self {
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            hits as f64 / total_requests as f64
        } else {
            0.0
        };
        Self {
            hits,
            misses,
            degraded,
            evictions,
            total_entries,
            hit_rate,
            tracked_clients,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for rejected requests
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_response_serialize() {
        let meta = FileMetadata {
            display_name: "a.txt".to_string(),
            storage_key: Some("k1".to_string()),
        };
        let json = serde_json::to_string(&FileResponse::new(1, meta, true)).unwrap();
        assert!(json.contains("\"storage_key\":\"k1\""));
        assert!(json.contains("\"cached\":true"));
    }

    #[test]
    fn test_rename_response_message() {
        let resp = RenameResponse::new(9, "b.txt");
        assert!(resp.message.contains("9"));
        assert_eq!(resp.display_name, "b.txt");
    }

    #[test]
    fn test_file_list_cursor_only_on_full_page() {
        let record = |id| FileRecord {
            id,
            owner_id: 2,
            display_name: format!("f{}", id),
            size_bytes: 1,
            created_at: chrono::Utc::now(),
            storage_key: None,
        };

        let full = FileListResponse::new(2, vec![record(3), record(8)], 2);
        assert_eq!(full.next_after, Some(8));

        let short = FileListResponse::new(2, vec![record(9)], 2);
        assert_eq!(short.next_after, None);
        assert_eq!(short.files[0].display_name, "f9");
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let resp = StatsResponse::new(80, 20, 1, 5, 100, 3);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.tracked_clients, 3);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(0, 0, 0, 0, 0, 0);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Too many requests");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Too many requests"));
    }
}
