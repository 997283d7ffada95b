//! Represents an uploaded video and its catalog metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single row of the video catalog.
///
/// The record describes a blob held by the file store; the bytes themselves
/// live on disk under `stored_name`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct VideoRecord {
    /// Monotonically assigned row id.
    pub id: i64,

    /// Generated blob key. Never derived from user input beyond the extension.
    pub stored_name: String,

    /// Filename as supplied by the uploader. Display only.
    pub original_name: String,

    /// When the upload completed.
    pub uploaded_at: DateTime<Utc>,

    /// Size of the blob in bytes.
    pub size_bytes: i64,

    /// Whether this is the video shown on the landing page.
    pub is_current: bool,
}

/// Fields required to insert a new catalog row.
#[derive(Clone, Debug)]
pub struct NewVideo {
    pub stored_name: String,
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub size_bytes: i64,
    /// Insert as the current video, clearing the flag everywhere else.
    pub is_current: bool,
}

impl VideoRecord {
    /// Public URL the blob is streamed from.
    pub fn public_path(&self) -> String {
        format!("/video/{}", self.id)
    }
}

/// JSON shape of a video returned by the upload endpoint.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub upload_date: String,
    pub size: i64,
    pub path: String,
    pub is_current: bool,
}

impl From<&VideoRecord> for VideoView {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.to_string(),
            filename: record.stored_name.clone(),
            original_name: record.original_name.clone(),
            upload_date: record.uploaded_at.to_rfc3339(),
            size: record.size_bytes,
            path: record.public_path(),
            is_current: record.is_current,
        }
    }
}

/// Everything the public and admin pages display.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub current: Option<VideoRecord>,
    /// Newest first.
    pub videos: Vec<VideoRecord>,
}
