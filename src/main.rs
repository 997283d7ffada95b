use anyhow::{Context, Result};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use video_showcase::{
    config::{AppConfig, RunMode},
    db, routes,
    services::{catalog_service::CatalogStore, video_service::VideoService},
    state::AppState,
    views::pages::format_size,
};

/// Rows printed by `--check-videos`.
const CHECK_VIDEOS_LIMIT: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + run mode ---
    let (cfg, mode) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting video-showcase with config: {:?}", cfg);

    // --- Ensure upload directory exists ---
    if !Path::new(&cfg.upload_dir).exists() {
        fs::create_dir_all(&cfg.upload_dir)
            .with_context(|| format!("creating upload directory {}", cfg.upload_dir))?;
        tracing::info!("Created upload directory at {}", cfg.upload_dir);
    }

    // --- Initialize SQLite connection + schema ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);
    db::run_migrations(&db).await?;

    match mode {
        RunMode::Migrate => {
            tracing::info!("Database migration complete.");
            return Ok(());
        }
        RunMode::CheckVideos => return check_videos(CatalogStore::new(db)).await,
        RunMode::Serve => {}
    }

    if cfg.admin.uses_default_password() {
        tracing::warn!("Admin password is the built-in default; set VIDEO_SITE_ADMIN_PASSWORD");
    }

    // --- Initialize core service ---
    let videos = VideoService::from_parts(db, cfg.upload_dir.clone(), cfg.max_upload_bytes);
    let state = AppState::new(videos, cfg.admin.clone());

    // --- Build router ---
    let app = routes::routes::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    let local = listener.local_addr()?;
    tracing::info!("Server listening on http://{}", local);
    tracing::info!("Admin panel: http://{}/admin", local);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Print the most recent catalog rows, newest first.
async fn check_videos(catalog: CatalogStore) -> Result<()> {
    let videos = catalog.recent(CHECK_VIDEOS_LIMIT).await?;
    if videos.is_empty() {
        println!("No videos in database.");
        return Ok(());
    }

    println!("Recent videos in database:");
    for video in videos {
        println!(
            "ID: {}, Stored: {}, Original: {}, Size: {}, Uploaded: {}, Current: {}",
            video.id,
            video.stored_name,
            video.original_name,
            format_size(video.size_bytes),
            video.uploaded_at.to_rfc3339(),
            video.is_current
        );
    }
    Ok(())
}
