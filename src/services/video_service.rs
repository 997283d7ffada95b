//! src/services/video_service.rs
//!
//! VideoService — pairs the catalog with the file store and fixes the order of
//! their side effects:
//! - upload: blob written, then row inserted as current
//! - delete: blob removed (best effort), then row removed
//!
//! A blob that cannot be removed is logged and left behind; the catalog row is
//! still deleted.

use crate::{
    models::video::{Library, NewVideo, VideoRecord},
    services::{
        catalog_service::{CatalogError, CatalogStore},
        file_store::{FileStore, FileStoreError},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use sqlx::SqlitePool;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::fs::File;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum VideoError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Files(#[from] FileStoreError),
}

pub type VideoResult<T> = Result<T, VideoError>;

#[derive(Clone)]
pub struct VideoService {
    pub catalog: CatalogStore,
    pub files: FileStore,
}

impl VideoService {
    pub fn new(catalog: CatalogStore, files: FileStore) -> Self {
        Self { catalog, files }
    }

    /// Build both stores from a pool and an upload directory.
    pub fn from_parts(db: Arc<SqlitePool>, upload_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self::new(
            CatalogStore::new(db),
            FileStore::new(upload_dir).with_max_bytes(max_bytes),
        )
    }

    /// Store an uploaded video and make it the current one.
    pub async fn upload<S>(
        &self,
        original_name: &str,
        declared_mime: Option<&str>,
        stream: S,
    ) -> VideoResult<VideoRecord>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let saved = self.files.save(original_name, declared_mime, stream).await?;

        let new_video = NewVideo {
            stored_name: saved.stored_name.clone(),
            original_name: original_name.to_string(),
            uploaded_at: Utc::now(),
            size_bytes: i64::try_from(saved.size_bytes).unwrap_or(i64::MAX),
            is_current: true,
        };

        let id = match self.catalog.insert(&new_video).await {
            Ok(id) => id,
            Err(err) => {
                if let Err(cleanup) = self.files.remove(&saved.stored_name).await {
                    warn!(
                        "failed to remove blob {} after catalog insert error: {}",
                        saved.stored_name, cleanup
                    );
                }
                return Err(err.into());
            }
        };

        info!(
            id,
            stored_name = %saved.stored_name,
            size_bytes = saved.size_bytes,
            "video uploaded and set as current"
        );
        Ok(self.catalog.get(id).await?)
    }

    pub async fn set_current(&self, id: i64) -> VideoResult<()> {
        self.catalog.promote_to_current(id).await?;
        info!(id, "current video changed");
        Ok(())
    }

    /// Remove a video's blob and then its catalog row.
    pub async fn delete(&self, id: i64) -> VideoResult<VideoRecord> {
        let record = self.catalog.get(id).await?;

        match self.files.remove(&record.stored_name).await {
            Ok(()) => {}
            Err(FileStoreError::NotFoundOnDisk(name)) => {
                debug!("blob {} already missing", name);
            }
            Err(err) => {
                warn!(
                    "failed to remove blob {} for video {}: {}",
                    record.stored_name, id, err
                );
            }
        }

        self.catalog.delete(id).await?;
        info!(id, stored_name = %record.stored_name, "video deleted");
        Ok(record)
    }

    /// Look up a video and open its blob for streaming.
    pub async fn open_video(&self, id: i64) -> VideoResult<(VideoRecord, File, u64)> {
        let record = self.catalog.get(id).await?;
        debug!(
            "serving video {} from {}",
            id,
            self.files.root().join(&record.stored_name).display()
        );
        let (file, len) = self.files.open(&record.stored_name).await?;
        Ok((record, file, len))
    }

    /// Current video plus the full newest-first list.
    pub async fn library(&self) -> VideoResult<Library> {
        let videos = self.catalog.list_all().await?;
        let current = videos.iter().find(|v| v.is_current).cloned();
        Ok(Library { current, videos })
    }
}
