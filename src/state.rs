use crate::{config::AdminCredentials, services::video_service::VideoService};
use axum::extract::FromRef;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub videos: VideoService,
    pub admin: Arc<AdminCredentials>,
}

impl AppState {
    pub fn new(videos: VideoService, admin: AdminCredentials) -> Self {
        Self {
            videos,
            admin: Arc::new(admin),
        }
    }
}

impl FromRef<AppState> for VideoService {
    fn from_ref(state: &AppState) -> Self {
        state.videos.clone()
    }
}

impl FromRef<AppState> for Arc<AdminCredentials> {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}
