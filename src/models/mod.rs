//! Data model and HTTP DTOs
//!
//! Record types shared by every component, plus the request/response
//! bodies used by the service surface.

pub mod record;
pub mod requests;
pub mod responses;

pub use record::{upload_key, FileMetadata, FileRecord, NewFileRecord, RecordId};
pub use requests::{ListFilesQuery, RenameRequest, UploadRequest};
pub use responses::{
    ErrorResponse, FileListResponse, FileResponse, FileSummary, HealthResponse, RenameResponse,
    StatsResponse, UploadResponse,
};
