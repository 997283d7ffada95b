//! src/services/catalog_service.rs
//!
//! CatalogStore — SQLite-backed table of video records. The only invariant the
//! service owns lives here: at most one row carries `is_current = 1`. Every
//! mutation that touches the flag runs inside a single transaction, and the
//! schema backs it up with a partial unique index.

use crate::models::video::{NewVideo, VideoRecord};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("video `{0}` not found")]
    NotFound(i64),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

const SELECT_COLUMNS: &str =
    "SELECT id, stored_name, original_name, uploaded_at, size_bytes, is_current FROM videos";

#[derive(Clone)]
pub struct CatalogStore {
    db: Arc<SqlitePool>,
}

impl CatalogStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Underlying pool, used by readiness probes.
    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Insert a record and return its id.
    ///
    /// When `video.is_current` is set, the flag is cleared on every other row
    /// in the same transaction, so the catalog never holds two current rows.
    pub async fn insert(&self, video: &NewVideo) -> CatalogResult<i64> {
        let mut tx = self.db.begin().await?;

        if video.is_current {
            sqlx::query("UPDATE videos SET is_current = 0 WHERE is_current = 1")
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query(
            "INSERT INTO videos (stored_name, original_name, uploaded_at, size_bytes, is_current)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&video.stored_name)
        .bind(&video.original_name)
        .bind(video.uploaded_at)
        .bind(video.size_bytes)
        .bind(video.is_current)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let id = result.last_insert_rowid();
        debug!(id, stored_name = %video.stored_name, "inserted catalog row");
        Ok(id)
    }

    /// All records, newest upload first.
    pub async fn list_all(&self) -> CatalogResult<Vec<VideoRecord>> {
        let rows = sqlx::query_as::<_, VideoRecord>(&format!(
            "{SELECT_COLUMNS} ORDER BY uploaded_at DESC, id DESC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// The `limit` most recent records, newest first.
    pub async fn recent(&self, limit: u32) -> CatalogResult<Vec<VideoRecord>> {
        let rows = sqlx::query_as::<_, VideoRecord>(&format!(
            "{SELECT_COLUMNS} ORDER BY uploaded_at DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> CatalogResult<VideoRecord> {
        sqlx::query_as::<_, VideoRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// The current record, if the catalog has one.
    pub async fn current(&self) -> CatalogResult<Option<VideoRecord>> {
        let row = sqlx::query_as::<_, VideoRecord>(&format!(
            "{SELECT_COLUMNS} WHERE is_current = 1 LIMIT 1"
        ))
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Make `id` the only current record.
    ///
    /// The first statement is a write, so the transaction holds SQLite's write
    /// lock before it reads anything and concurrent promotions queue on the
    /// busy timeout. The clear only applies when `id` exists; an unknown id
    /// returns `NotFound` and the rollback leaves the catalog untouched.
    pub async fn promote_to_current(&self, id: i64) -> CatalogResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE videos SET is_current = 0
             WHERE is_current = 1 AND EXISTS (SELECT 1 FROM videos WHERE id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let promoted = sqlx::query("UPDATE videos SET is_current = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if promoted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(CatalogError::NotFound(id));
        }

        tx.commit().await?;
        debug!(id, "promoted to current");
        Ok(())
    }

    /// Remove a record. Deleting the current record leaves no current video.
    pub async fn delete(&self, id: i64) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, Utc};

    async fn store() -> CatalogStore {
        let pool = db::connect_in_memory().await.unwrap();
        CatalogStore::new(Arc::new(pool))
    }

    fn new_video(name: &str, minutes_ago: i64, is_current: bool) -> NewVideo {
        NewVideo {
            stored_name: format!("{name}.mp4"),
            original_name: format!("{name} original.mp4"),
            uploaded_at: Utc::now() - Duration::minutes(minutes_ago),
            size_bytes: 42,
            is_current,
        }
    }

    async fn current_count(store: &CatalogStore) -> usize {
        store
            .list_all()
            .await
            .unwrap()
            .iter()
            .filter(|v| v.is_current)
            .count()
    }

    #[tokio::test]
    async fn insert_and_get_round_trips_fields() {
        let store = store().await;
        let video = new_video("a", 0, false);
        let id = store.insert(&video).await.unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.stored_name, "a.mp4");
        assert_eq!(record.original_name, "a original.mp4");
        assert_eq!(record.size_bytes, 42);
        assert!(!record.is_current);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = store().await;
        assert!(matches!(store.get(99).await, Err(CatalogError::NotFound(99))));
    }

    #[tokio::test]
    async fn inserting_current_clears_previous_current() {
        let store = store().await;
        let a = store.insert(&new_video("a", 2, true)).await.unwrap();
        let b = store.insert(&new_video("b", 1, true)).await.unwrap();

        assert!(!store.get(a).await.unwrap().is_current);
        assert!(store.get(b).await.unwrap().is_current);
        assert_eq!(current_count(&store).await, 1);
        assert_eq!(store.current().await.unwrap().map(|v| v.id), Some(b));
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let store = store().await;
        let old = store.insert(&new_video("old", 10, false)).await.unwrap();
        let new = store.insert(&new_video("new", 1, false)).await.unwrap();
        let mid = store.insert(&new_video("mid", 5, false)).await.unwrap();

        let ids: Vec<i64> = store.list_all().await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![new, mid, old]);

        let recent: Vec<i64> = store.recent(2).await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(recent, vec![new, mid]);
    }

    #[tokio::test]
    async fn promote_sets_exactly_one_current() {
        let store = store().await;
        let a = store.insert(&new_video("a", 3, false)).await.unwrap();
        let b = store.insert(&new_video("b", 2, true)).await.unwrap();
        let c = store.insert(&new_video("c", 1, false)).await.unwrap();

        store.promote_to_current(a).await.unwrap();

        for record in store.list_all().await.unwrap() {
            assert_eq!(record.is_current, record.id == a, "record {}", record.id);
        }
        assert!(!store.get(b).await.unwrap().is_current);
        assert!(!store.get(c).await.unwrap().is_current);
    }

    #[tokio::test]
    async fn promote_unknown_id_leaves_catalog_unchanged() {
        let store = store().await;
        store.insert(&new_video("a", 2, false)).await.unwrap();
        store.insert(&new_video("b", 1, true)).await.unwrap();
        let before = store.list_all().await.unwrap();

        let result = store.promote_to_current(12345).await;

        assert!(matches!(result, Err(CatalogError::NotFound(12345))));
        assert_eq!(store.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn promoting_the_current_record_keeps_it_current() {
        let store = store().await;
        let a = store.insert(&new_video("a", 1, true)).await.unwrap();

        store.promote_to_current(a).await.unwrap();

        assert_eq!(store.current().await.unwrap().map(|v| v.id), Some(a));
        assert_eq!(current_count(&store).await, 1);
    }

    #[tokio::test]
    async fn concurrent_promotions_all_succeed_on_a_shared_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("videos.db").display());
        let pool = db::connect(&url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let store = CatalogStore::new(Arc::new(pool));

        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(store.insert(&new_video(&format!("v{i}"), i, false)).await.unwrap());
        }

        let mut tasks = Vec::new();
        for _ in 0..4 {
            for &id in &ids {
                let store = store.clone();
                tasks.push(tokio::spawn(async move { store.promote_to_current(id).await }));
            }
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(current_count(&store).await, 1);
        let current = store.current().await.unwrap().unwrap();
        assert!(ids.contains(&current.id));
    }

    #[tokio::test]
    async fn deleting_current_leaves_zero_current() {
        let store = store().await;
        let a = store.insert(&new_video("a", 2, false)).await.unwrap();
        let b = store.insert(&new_video("b", 1, true)).await.unwrap();

        store.delete(b).await.unwrap();

        assert!(matches!(store.get(b).await, Err(CatalogError::NotFound(_))));
        assert_eq!(current_count(&store).await, 0);
        assert!(store.current().await.unwrap().is_none());
        let ids: Vec<i64> = store.list_all().await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![a]);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let store = store().await;
        assert!(matches!(store.delete(7).await, Err(CatalogError::NotFound(7))));
    }

    #[tokio::test]
    async fn invariant_holds_across_mixed_operations() {
        let store = store().await;
        let mut ids = Vec::new();
        for i in 0..6 {
            let id = store
                .insert(&new_video(&format!("v{i}"), 10 - i, i % 2 == 0))
                .await
                .unwrap();
            ids.push(id);
            assert!(current_count(&store).await <= 1);
        }

        store.promote_to_current(ids[1]).await.unwrap();
        assert_eq!(current_count(&store).await, 1);
        store.delete(ids[1]).await.unwrap();
        assert_eq!(current_count(&store).await, 0);
        let _ = store.promote_to_current(ids[1]).await;
        assert_eq!(current_count(&store).await, 0);
        store.promote_to_current(ids[3]).await.unwrap();
        store.delete(ids[0]).await.unwrap();
        assert_eq!(current_count(&store).await, 1);
        assert!(store.get(ids[3]).await.unwrap().is_current);
    }

    #[tokio::test]
    async fn schema_rejects_a_second_current_row() {
        let store = store().await;
        store.insert(&new_video("a", 1, true)).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO videos (stored_name, original_name, uploaded_at, size_bytes, is_current)
             VALUES ('x.mp4', 'x.mp4', '2024-01-01T00:00:00Z', 1, 1)",
        )
        .execute(store.pool())
        .await;

        assert!(result.is_err());
        assert_eq!(current_count(&store).await, 1);
    }
}
