//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> catalog query plus an upload-directory write probe

use crate::services::video_service::VideoService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckStatus {
    fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(error) => Self {
                ok: false,
                error: Some(error),
            },
        }
    }
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when the catalog answers and the upload directory is writable,
/// 503 otherwise.
pub async fn readyz(State(service): State<VideoService>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("sqlite", CheckStatus::from_result(check_catalog(&service).await));
    checks.insert(
        "upload_dir",
        CheckStatus::from_result(check_upload_dir(&service).await),
    );

    let ready = checks.values().all(|c| c.ok);
    if !ready {
        tracing::warn!("readiness probe failed");
    }
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            status: if ready { "ok" } else { "error" },
            checks,
        }),
    )
}

async fn check_catalog(service: &VideoService) -> Result<(), String> {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(service.catalog.pool())
        .await
    {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    }
}

async fn check_upload_dir(service: &VideoService) -> Result<(), String> {
    let probe = service
        .files
        .root()
        .join(format!(".readyz-{}", Uuid::new_v4()));

    fs::write(&probe, b"readyz")
        .await
        .map_err(|e| format!("could not write probe file: {}", e))?;
    let read = fs::read(&probe).await;
    let _ = fs::remove_file(&probe).await;

    match read {
        Ok(bytes) if bytes == b"readyz" => Ok(()),
        Ok(_) => Err("probe file content mismatch".into()),
        Err(e) => Err(format!("could not read probe file: {}", e)),
    }
}
