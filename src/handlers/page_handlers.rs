//! Rendered pages: the public landing page and the admin panel.

use crate::{errors::AppError, services::video_service::VideoService, views::pages};
use axum::{extract::State, response::Html};

/// `GET /`
pub async fn index_page(State(service): State<VideoService>) -> Result<Html<String>, AppError> {
    let library = service.library().await?;
    Ok(Html(pages::render_index(&library)))
}

/// `GET /admin`
pub async fn admin_page(State(service): State<VideoService>) -> Result<Html<String>, AppError> {
    let library = service.library().await?;
    Ok(Html(pages::render_admin(&library)))
}
