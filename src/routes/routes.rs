//! Defines routes for the public site and the admin panel.
//!
//! ## Structure
//! - **Public**
//!   - `GET    /`                        — landing page (current video + list)
//!   - `GET    /video/{id}`              — stream a video
//!   - `GET    /healthz`, `GET /readyz`  — probes
//!
//! - **Admin** (HTTP Basic challenge)
//!   - `GET    /admin`                   — admin page
//!   - `POST   /upload`                  — multipart upload, field `video`
//!   - `POST   /set-current-video/{id}`  — promote a video
//!   - `DELETE /delete-video/{id}`       — remove blob and record

use crate::{
    auth::require_admin,
    handlers::{
        health_handlers::{healthz, readyz},
        page_handlers::{admin_page, index_page},
        video_handlers::{delete_video, set_current_video, stream_video, upload_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build the full application router.
///
/// The upload route lifts axum's default body limit; the file store enforces
/// its own ceiling while streaming.
pub fn routes(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin", get(admin_page))
        .route(
            "/upload",
            post(upload_video).layer(DefaultBodyLimit::disable()),
        )
        .route("/set-current-video/{video_id}", post(set_current_video))
        .route("/delete-video/{video_id}", delete(delete_video))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .route("/", get(index_page))
        .route("/video/{id}", get(stream_video))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
