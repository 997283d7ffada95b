//! src/services/file_store.rs
//!
//! FileStore — flat directory of uploaded video blobs keyed by generated
//! names. Uploads are streamed to a hidden temp file and fsynced. The final
//! name is then claimed exclusively and the temp file renamed over the claim,
//! so a partially written blob never appears under its final name and an
//! existing blob is never replaced.

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Default upload ceiling: 500 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

const MAX_EXTENSION_LEN: usize = 10;
const RESERVE_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("unsupported media type `{0}`")]
    UnsupportedMediaType(String),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },
    #[error("invalid stored name")]
    InvalidStoredName,
    #[error("blob `{0}` not found on disk")]
    NotFoundOnDisk(String),
    /// The upload body failed before it ended.
    #[error("upload body could not be read: {0}")]
    BodyRead(#[source] io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type FileStoreResult<T> = Result<T, FileStoreError>;

/// A blob that has been durably written.
#[derive(Debug, Clone)]
pub struct SavedBlob {
    pub stored_name: String,
    pub size_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: u64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Accept only `video/*` declared types.
    pub fn ensure_video_type(declared: Option<&str>) -> FileStoreResult<()> {
        match declared {
            Some(mime) if mime.trim().to_ascii_lowercase().starts_with("video/") => Ok(()),
            Some(mime) => Err(FileStoreError::UnsupportedMediaType(mime.to_string())),
            None => Err(FileStoreError::UnsupportedMediaType(String::new())),
        }
    }

    /// Stream a video blob to disk and return its generated name.
    ///
    /// The declared type is checked before any byte is written. The size limit
    /// is enforced while streaming; on overrun or any I/O error the temp file
    /// is removed and nothing is left behind.
    pub async fn save<S>(
        &self,
        original_name: &str,
        declared_mime: Option<&str>,
        stream: S,
    ) -> FileStoreResult<SavedBlob>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        Self::ensure_video_type(declared_mime)?;

        fs::create_dir_all(&self.root).await?;
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let size_bytes = match self.write_stream(&tmp_path, stream).await {
            Ok(size_bytes) => size_bytes,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        };

        let (stored_name, final_path) = match self.reserve_name(original_name).await {
            Ok(reserved) => reserved,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        };
        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            let _ = fs::remove_file(&final_path).await;
            return Err(FileStoreError::Io(err));
        }

        debug!("stored blob {} ({} bytes)", final_path.display(), size_bytes);
        Ok(SavedBlob {
            stored_name,
            size_bytes,
        })
    }

    /// Pick a fresh stored name and claim it with an empty placeholder, so a
    /// generated name that is already taken is never overwritten.
    async fn reserve_name(&self, original_name: &str) -> FileStoreResult<(String, PathBuf)> {
        for _ in 0..RESERVE_ATTEMPTS {
            let stored_name = generate_stored_name(original_name);
            if let Some(path) = self.claim(&stored_name).await? {
                return Ok((stored_name, path));
            }
            debug!("stored name {} already taken, generating another", stored_name);
        }
        Err(FileStoreError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            "could not find a free stored name",
        )))
    }

    /// Create `stored_name` exclusively. `None` when the name is taken.
    async fn claim(&self, stored_name: &str) -> FileStoreResult<Option<PathBuf>> {
        let path = self.resolve(stored_name)?;
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => Ok(Some(path)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(FileStoreError::Io(err)),
        }
    }

    async fn write_stream<S>(&self, tmp_path: &Path, stream: S) -> FileStoreResult<u64>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let mut file = File::create(tmp_path).await?;
        let mut size_bytes: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FileStoreError::BodyRead)?;
            size_bytes += chunk.len() as u64;
            if size_bytes > self.max_bytes {
                return Err(FileStoreError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok(size_bytes)
    }

    /// Map a stored name to its path under the root.
    ///
    /// Names are generated by `save`, but anything that could escape the root
    /// is still rejected.
    pub fn resolve(&self, stored_name: &str) -> FileStoreResult<PathBuf> {
        if stored_name.is_empty()
            || stored_name.starts_with('.')
            || stored_name.contains("..")
            || stored_name.contains('/')
            || stored_name.contains('\\')
            || stored_name.bytes().any(|b| b.is_ascii_control())
        {
            return Err(FileStoreError::InvalidStoredName);
        }
        Ok(self.root.join(stored_name))
    }

    /// Open a blob for streaming out, returning the handle and its length.
    pub async fn open(&self, stored_name: &str) -> FileStoreResult<(File, u64)> {
        let path = self.resolve(stored_name)?;
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                FileStoreError::NotFoundOnDisk(stored_name.to_string())
            } else {
                FileStoreError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Delete a blob. A blob that is already gone reports `NotFoundOnDisk`.
    pub async fn remove(&self, stored_name: &str) -> FileStoreResult<()> {
        let path = self.resolve(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("removed physical file {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(FileStoreError::NotFoundOnDisk(stored_name.to_string()))
            }
            Err(err) => Err(FileStoreError::Io(err)),
        }
    }
}

/// `<unix-millis>-<random>` plus the original extension when it is a plain
/// alphanumeric suffix.
fn generate_stored_name(original_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = rand::random::<u32>() % 1_000_000_000;
    match sanitized_extension(original_name) {
        Some(ext) => format!("{millis}-{suffix}.{ext}"),
        None => format!("{millis}-{suffix}"),
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::tempdir;

    fn chunks(parts: &[&str]) -> impl Stream<Item = io::Result<Bytes>> + use<> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from(p.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    async fn dir_entries(path: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(path).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names
    }

    #[tokio::test]
    async fn save_writes_blob_under_generated_name() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let saved = store
            .save("Holiday Clip.MP4", Some("video/mp4"), chunks(&["abc", "def"]))
            .await
            .unwrap();

        assert_eq!(saved.size_bytes, 6);
        assert!(saved.stored_name.ends_with(".mp4"));
        assert!(!saved.stored_name.contains("Holiday"));
        let bytes = fs::read(dir.path().join(&saved.stored_name)).await.unwrap();
        assert_eq!(bytes, b"abcdef");
        assert_eq!(dir_entries(dir.path()).await, vec![saved.stored_name]);
    }

    #[tokio::test]
    async fn save_rejects_non_video_type_without_writing() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let result = store
            .save("notes.txt", Some("text/plain"), chunks(&["hello"]))
            .await;
        assert!(matches!(result, Err(FileStoreError::UnsupportedMediaType(_))));

        let result = store.save("clip.mp4", None, chunks(&["hello"])).await;
        assert!(matches!(result, Err(FileStoreError::UnsupportedMediaType(_))));

        assert!(dir_entries(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn save_rejects_oversized_upload_and_cleans_up() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_max_bytes(4);

        let result = store
            .save("big.webm", Some("video/webm"), chunks(&["abc", "de"]))
            .await;

        assert!(matches!(
            result,
            Err(FileStoreError::PayloadTooLarge { limit: 4 })
        ));
        assert!(dir_entries(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn save_cleans_up_on_stream_error() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::other("client went away")),
        ]);

        let result = store.save("clip.mp4", Some("video/mp4"), failing).await;

        assert!(matches!(result, Err(FileStoreError::BodyRead(_))));
        assert!(dir_entries(dir.path()).await.is_empty());
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = FileStore::new("/srv/uploads");
        for bad in ["", "../etc/passwd", "a/b.mp4", "..", ".hidden", "a\\b", "x\n.mp4"] {
            assert!(
                matches!(store.resolve(bad), Err(FileStoreError::InvalidStoredName)),
                "{bad:?} should be rejected"
            );
        }
        assert_eq!(
            store.resolve("1700000000000-42.mp4").unwrap(),
            PathBuf::from("/srv/uploads/1700000000000-42.mp4")
        );
    }

    #[test]
    fn stored_names_keep_only_safe_extensions() {
        assert!(generate_stored_name("clip.mov").ends_with(".mov"));
        assert!(!generate_stored_name("clip").contains('.'));
        assert!(!generate_stored_name("clip.m p4").contains('.'));
        assert!(!generate_stored_name("../../evil.mp4/").contains('/'));
        assert_ne!(generate_stored_name("a.mp4"), generate_stored_name("a.mp4"));
    }

    #[tokio::test]
    async fn claim_never_takes_an_existing_blob() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let taken = dir.path().join("1700000000000-7.mp4");
        fs::write(&taken, b"first upload").await.unwrap();

        assert!(store.claim("1700000000000-7.mp4").await.unwrap().is_none());
        assert_eq!(fs::read(&taken).await.unwrap(), b"first upload");

        let fresh = store.claim("1700000000000-8.mp4").await.unwrap().unwrap();
        assert_eq!(fresh, dir.path().join("1700000000000-8.mp4"));
        assert!(matches!(
            store.claim("../escape.mp4").await,
            Err(FileStoreError::InvalidStoredName)
        ));
    }

    #[tokio::test]
    async fn saves_never_replace_each_other() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let mut saved = Vec::new();
        for i in 0..20 {
            let body = format!("clip-{i}");
            let blob = store
                .save("clip.mp4", Some("video/mp4"), chunks(&[body.as_str()]))
                .await
                .unwrap();
            saved.push((blob.stored_name, body));
        }

        assert_eq!(dir_entries(dir.path()).await.len(), 20);
        for (name, body) in saved {
            assert_eq!(fs::read(dir.path().join(name)).await.unwrap(), body.as_bytes());
        }
    }

    #[tokio::test]
    async fn remove_reports_missing_blob() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let saved = store
            .save("clip.mp4", Some("video/mp4"), chunks(&["x"]))
            .await
            .unwrap();

        store.remove(&saved.stored_name).await.unwrap();
        assert!(matches!(
            store.remove(&saved.stored_name).await,
            Err(FileStoreError::NotFoundOnDisk(_))
        ));
        assert!(matches!(
            store.open(&saved.stored_name).await,
            Err(FileStoreError::NotFoundOnDisk(_))
        ));
    }
}
