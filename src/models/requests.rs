//! Request DTOs for the service surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use super::RecordId;

/// Maximum display name length in bytes.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 255;

/// Request body for POST /files/:id/rename
#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    /// The new display name
    pub display_name: String,
}

impl RenameRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_display_name(&self.display_name)
    }
}

/// Request body for POST /files
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub owner_id: i64,
    pub display_name: String,
    /// File content, stored as UTF-8 bytes
    pub content: String,
}

impl UploadRequest {
    pub fn validate(&self) -> Option<String> {
        if self.content.len() > MAX_UPLOAD_SIZE {
            return Some(format!(
                "Content exceeds maximum size of {} bytes",
                MAX_UPLOAD_SIZE
            ));
        }
        validate_display_name(&self.display_name)
    }
}

/// Maximum upload size in bytes (10MB).
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default and maximum page size for GET /files.
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 100;

/// Query string for GET /files
#[derive(Debug, Clone, Deserialize)]
pub struct ListFilesQuery {
    pub owner_id: i64,
    /// Keyset cursor: the last id of the previous page
    pub after: Option<RecordId>,
    pub limit: Option<usize>,
}

impl ListFilesQuery {
    /// Requested page size clamped to `1..=MAX_LIST_LIMIT`.
    pub fn page_size(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

fn validate_display_name(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return Some("Display name cannot be empty".to_string());
    }
    if name.len() > MAX_DISPLAY_NAME_LENGTH {
        return Some(format!(
            "Display name exceeds maximum length of {} bytes",
            MAX_DISPLAY_NAME_LENGTH
        ));
    }
    None
}
