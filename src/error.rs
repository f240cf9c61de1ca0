//! Error types for the metadata core
//!
//! Two layers: `BackendError` for failures reported by the external
//! collaborators (metadata store, blob store, cache backend) and
//! `ServiceError` for what the core hands back to its callers.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::RecordId;

// == Backend Error Enum ==
/// Failure reported by an external backend.
///
/// `NotFound` is kept apart from `Unavailable` so callers can tell a
/// genuinely absent object from a backend they could not reach.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached or answered with a failure
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its deadline
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The addressed object does not exist
    #[error("object not found: {0}")]
    NotFound(String),
}

impl BackendError {
    /// Returns true for failures worth retrying (network or deadline).
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Unavailable(_) | BackendError::Timeout(_))
    }
}

/// Convenience Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Runs a backend future under a deadline, mapping expiry to `Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> BackendResult<T>
where
    F: std::future::Future<Output = BackendResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(deadline)),
    }
}

// == Service Error Enum ==
/// Error type returned by the core to request handlers.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No record exists with this id
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// The authoritative metadata store could not serve the request
    #[error("Metadata store unavailable: {0}")]
    StoreUnavailable(String),

    /// The blob store could not take or return file content
    #[error("Blob store unavailable: {0}")]
    BlobUnavailable(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        ServiceError::StoreUnavailable(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::StoreUnavailable(_) | ServiceError::BlobUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for core operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
