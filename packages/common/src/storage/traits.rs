use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::path::{BlobHandle, BlobPath};

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressable blob storage with publicly linkable objects.
///
/// Writes are idempotent overwrites: writing twice to the same path leaves
/// whichever write landed last. There are no multi-path transactions, so a
/// caller writing the same bytes to two paths may observe one write without
/// the other if it is interrupted in between.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists.
    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn read(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read_stream(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn read_stream(&self, path: &BlobPath) -> Result<BoxReader, StorageError>;

    /// Store bytes at `path`, replacing any previous blob.
    async fn write(
        &self,
        path: &BlobPath,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Make the blob publicly readable and return its URL.
    async fn make_public(&self, path: &BlobPath) -> Result<String, StorageError>;

    /// List blobs whose path starts with `prefix` and whose extension is in
    /// `extensions` (empty matches all). Results are sorted by path.
    async fn list_by_prefix(
        &self,
        prefix: &str,
        extensions: &[&str],
    ) -> Result<Vec<BlobHandle>, StorageError>;

    /// Copy a blob to another path.
    async fn copy(&self, from: &BlobPath, to: &BlobPath) -> Result<(), StorageError> {
        let data = self.read(from).await?;
        self.write(to, &data, &from.content_type()).await
    }
}
