use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::path::{BlobHandle, BlobPath};
use super::traits::{BlobStore, BoxReader};

/// Directory holding in-flight writes. Hidden, so it can never collide with a
/// valid [`BlobPath`].
const TMP_DIR: &str = ".tmp";

/// Filesystem-backed blob store.
///
/// Blob paths map directly onto the directory tree under `base_path`; public
/// URLs are `{public_base_url}/{path}` and are expected to be served by the
/// application itself.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TMP_DIR)).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Compute the filesystem path for a blob path.
    fn blob_path(&self, path: &BlobPath) -> PathBuf {
        path.segments()
            .fold(self.base_path.clone(), |acc, segment| acc.join(segment))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Convert an on-disk file back into a blob path relative to the root.
    fn relative_blob_path(&self, file: &Path) -> Option<BlobPath> {
        let relative = file.strip_prefix(&self.base_path).ok()?;
        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        BlobPath::from_segments(segments).ok()
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(path);
        match fs::metadata(&blob_path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_stream(&self, path: &BlobPath) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(path);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(
        &self,
        path: &BlobPath,
        data: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let blob_path = self.blob_path(path);

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // rename() replaces the target atomically, so concurrent writers to
        // the same path converge on the last one to land.
        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn make_public(&self, path: &BlobPath) -> Result<String, StorageError> {
        if !self.exists(path).await? {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, path))
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        extensions: &[&str],
    ) -> Result<Vec<BlobHandle>, StorageError> {
        // Start the walk at the deepest directory named by the prefix.
        let dir_part = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let start = dir_part
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.base_path.clone(), |acc, segment| acc.join(segment));

        let mut handles = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let entry_path = entry.path();

                if file_type.is_dir() {
                    if entry.file_name() != TMP_DIR {
                        pending.push(entry_path);
                    }
                    continue;
                }

                let Some(blob_path) = self.relative_blob_path(&entry_path) else {
                    tracing::debug!(path = %entry_path.display(), "Skipping non-blob file");
                    continue;
                };

                if !blob_path.as_str().starts_with(prefix) || !blob_path.has_extension(extensions)
                {
                    continue;
                }

                let size = entry.metadata().await?.len();
                handles.push(BlobHandle {
                    path: blob_path,
                    size,
                });
            }
        }

        handles.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(handles)
    }
}
