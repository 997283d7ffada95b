//! HTTP handlers for video upload, selection, deletion and playback.
//! Uploads and downloads are streamed; storage concerns are delegated to
//! `VideoService`.

use crate::{
    errors::AppError,
    models::video::{VideoRecord, VideoView},
    services::video_service::VideoService,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures::TryStreamExt;
use serde::Serialize;
use std::io;
use tokio_util::io::ReaderStream;

/// Multipart field carrying the video file.
pub const UPLOAD_FIELD: &str = "video";

const FALLBACK_VIDEO_TYPE: &str = "video/mp4";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub video: VideoView,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// `POST /upload` — multipart upload, file in field `video`.
pub async fn upload_video(
    State(service): State<VideoService>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Invalid multipart body: {}", err)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "video".into());
        let content_type = field.content_type().map(str::to_string);

        // A field that breaks off mid-body comes back as `BodyRead`, a 400.
        let stream = field.map_err(io::Error::other);
        let record = service
            .upload(&original_name, content_type.as_deref(), stream)
            .await?;

        return Ok(Json(UploadResponse {
            success: true,
            message: "Video uploaded successfully!".into(),
            video: VideoView::from(&record),
        }));
    }

    Err(AppError::bad_request("No video file uploaded"))
}

/// `POST /set-current-video/{id}`
pub async fn set_current_video(
    State(service): State<VideoService>,
    Path(video_id): Path<i64>,
) -> Result<Json<ActionResponse>, AppError> {
    service.set_current(video_id).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Current video updated successfully".into(),
    }))
}

/// `DELETE /delete-video/{id}`
pub async fn delete_video(
    State(service): State<VideoService>,
    Path(video_id): Path<i64>,
) -> Result<Json<ActionResponse>, AppError> {
    service.delete(video_id).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Video deleted successfully".into(),
    }))
}

/// `GET /video/{id}` — stream the blob.
pub async fn stream_video(
    State(service): State<VideoService>,
    Path(video_id): Path<i64>,
) -> Result<Response, AppError> {
    let (record, file, len) = service.open_video(video_id).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_video_headers(response.headers_mut(), &record, len);
    Ok(response)
}

fn set_video_headers(headers: &mut HeaderMap, record: &VideoRecord, len: u64) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&video_content_type(&record.stored_name))
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_VIDEO_TYPE)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let disposition = format!("inline; filename=\"{}\"", record.stored_name);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
}

/// Guess from the stored extension; anything that is not a video type is
/// served as mp4.
fn video_content_type(stored_name: &str) -> String {
    mime_guess::from_path(stored_name)
        .iter()
        .find(|mime| mime.type_() == mime_guess::mime::VIDEO)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_VIDEO_TYPE.to_string())
}
