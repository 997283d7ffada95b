use crate::services::{
    catalog_service::CatalogError, file_store::FileStoreError, video_service::VideoError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => AppError::not_found("Video not found"),
            CatalogError::Storage(err) => {
                tracing::error!("catalog storage failure: {}", err);
                AppError::internal("Failed to access video catalog")
            }
        }
    }
}

impl From<FileStoreError> for AppError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::UnsupportedMediaType(_) => AppError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Only video files are allowed!",
            ),
            FileStoreError::PayloadTooLarge { limit } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Video exceeds the maximum size of {} bytes", limit),
            ),
            FileStoreError::BodyRead(err) => {
                tracing::warn!("upload body failed: {}", err);
                AppError::bad_request(format!("Invalid multipart body: {}", err))
            }
            FileStoreError::NotFoundOnDisk(name) => {
                tracing::warn!("catalog references missing blob {}", name);
                AppError::not_found("Video not found")
            }
            other => {
                tracing::error!("video file failure: {}", other);
                AppError::internal("Failed to access video file")
            }
        }
    }
}

impl From<VideoError> for AppError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::Catalog(err) => err.into(),
            VideoError::Files(err) => err.into(),
        }
    }
}
