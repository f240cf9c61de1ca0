//! File record types
//!
//! `FileRecord` is the authoritative row owned by the metadata store.
//! `FileMetadata` is the derived snapshot the cache holds for a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned record identifier.
pub type RecordId = i64;

// == File Record ==
/// Metadata row for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Assigned by the store on creation, immutable
    pub id: RecordId,
    /// Uploading client, immutable
    pub owner_id: i64,
    /// Human-readable name, mutable through rename
    pub display_name: String,
    /// Size of the uploaded content in bytes
    pub size_bytes: u64,
    /// Creation time, used as the retention timestamp
    pub created_at: DateTime<Utc>,
    /// Blob store key; unset until the upload completes
    pub storage_key: Option<String>,
}

impl FileRecord {
    /// Returns true once the blob has been written and linked.
    pub fn is_uploaded(&self) -> bool {
        self.storage_key.is_some()
    }

    /// Key the upload flow writes this record's blob under.
    ///
    /// Built from immutable fields only, so it can be recomputed for a
    /// record whose link step never completed, even after a rename.
    pub fn upload_key(&self) -> String {
        upload_key(self.owner_id, self.id)
    }

    /// Where this record's blob lives, or would live if the upload got as
    /// far as the blob write.
    pub fn blob_key(&self) -> String {
        self.storage_key
            .clone()
            .unwrap_or_else(|| self.upload_key())
    }
}

/// Blob key for the record `id` owned by `owner_id`.
pub fn upload_key(owner_id: i64, id: RecordId) -> String {
    format!("uploads/{}/{}", owner_id, id)
}

// == New File Record ==
/// Fields supplied by the caller when a record is created.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: i64,
    pub display_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl NewFileRecord {
    /// Creates a new record description stamped with the current time.
    pub fn new(owner_id: i64, display_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            owner_id,
            display_name: display_name.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Overrides the creation timestamp.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

// == File Metadata ==
/// Cached view of a record: the fields a share lookup needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub display_name: String,
    pub storage_key: Option<String>,
}

impl From<&FileRecord> for FileMetadata {
    fn from(record: &FileRecord) -> Self {
        Self {
            display_name: record.display_name.clone(),
            storage_key: record.storage_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_record_defaults_to_now() {
        let before = Utc::now();
        let new = NewFileRecord::new(1, "report.pdf", 1024);
        assert!(new.created_at >= before);
        assert_eq!(new.display_name, "report.pdf");
    }

    #[test]
    fn test_created_at_override() {
        let past = Utc::now() - Duration::minutes(30);
        let new = NewFileRecord::new(1, "old.txt", 3).created_at(past);
        assert_eq!(new.created_at, past);
    }

    #[test]
    fn test_metadata_from_record() {
        let record = FileRecord {
            id: 42,
            owner_id: 7,
            display_name: "photo.png".to_string(),
            size_bytes: 10,
            created_at: Utc::now(),
            storage_key: Some("k42".to_string()),
        };
        let meta = FileMetadata::from(&record);
        assert_eq!(meta.storage_key.as_deref(), Some("k42"));
        assert_eq!(meta.display_name, "photo.png");
        assert!(record.is_uploaded());
    }

    #[test]
    fn test_blob_key_falls_back_to_upload_key() {
        let mut record = FileRecord {
            id: 9,
            owner_id: 3,
            display_name: "draft.txt".to_string(),
            size_bytes: 1,
            created_at: Utc::now(),
            storage_key: None,
        };
        assert_eq!(record.blob_key(), "uploads/3/9");

        // A rename does not move the derived key
        record.display_name = "final.txt".to_string();
        assert_eq!(record.blob_key(), record.upload_key());

        record.storage_key = Some("legacy/k9".to_string());
        assert_eq!(record.blob_key(), "legacy/k9");
    }

    #[test]
    fn test_metadata_json_shape() {
        let meta = FileMetadata {
            display_name: "a".to_string(),
            storage_key: None,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"display_name":"a","storage_key":null}"#);
    }
}
