use std::sync::Arc;

use common::CanonicalKey;
use common::storage::{BlobPath, BlobStore, StorageError};
use tracing::{debug, warn};

use crate::generator::{GeneratedImage, ImageFormat};
use crate::index::{AssetIndex, AssetRecord, IndexError, NewAsset};
use crate::kind::{AssetKind, KeyRules};

/// Outcome of registering a shared-pool blob in the Asset Index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted(i32),
    /// The key was already indexed, possibly by a concurrent writer.
    AlreadyPresent,
    /// The key is taken by an asset of another kind; the existing row stays.
    OtherKind(AssetKind),
}

/// The shared blob region of one asset kind, plus its index entries.
///
/// Exposes the two ways of asking "does this asset exist already":
/// [`check_path`](Self::check_path) checks the deterministic blob path
/// directly and works before the index has ever been populated;
/// [`check_index`](Self::check_index) asks the Asset Index. Callers decide
/// which is authoritative; the caches use the path first.
pub struct SharedPool {
    kind: AssetKind,
    prefix: String,
    keys: KeyRules,
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn AssetIndex>,
}

impl SharedPool {
    pub fn new(
        kind: AssetKind,
        prefix: impl Into<String>,
        keys: KeyRules,
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn AssetIndex>,
    ) -> Self {
        Self {
            kind,
            prefix: prefix.into(),
            keys,
            blobs,
            index,
        }
    }

    /// Canonical key for a label in this pool.
    pub fn key_for(&self, label: &str) -> CanonicalKey {
        self.keys.key(self.kind, label)
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn index(&self) -> &Arc<dyn AssetIndex> {
        &self.index
    }

    /// Deterministic shared path: `<prefix>/<key>.<ext>`.
    pub fn path_for(
        &self,
        key: &CanonicalKey,
        format: ImageFormat,
    ) -> Result<BlobPath, StorageError> {
        BlobPath::parse(&format!(
            "{}/{}.{}",
            self.prefix,
            key,
            format.extension()
        ))
    }

    /// Direct blob check at `<prefix>/<key>.jpg`, then `.png`.
    pub async fn check_path(&self, key: &CanonicalKey) -> Result<Option<BlobPath>, StorageError> {
        for format in ImageFormat::LOOKUP_ORDER {
            let path = self.path_for(key, format)?;
            if self.blobs.exists(&path).await? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Index lookup restricted to this pool's kind.
    pub async fn check_index(&self, key: &CanonicalKey) -> Result<Option<AssetRecord>, IndexError> {
        Ok(self
            .index
            .find_exact(key.as_str())
            .await?
            .filter(|record| record.kind == self.kind))
    }

    /// Find an existing shared blob: path check first, index second.
    ///
    /// Index failures and dangling index rows are logged and treated as a
    /// miss; only a failing path check is an error.
    pub async fn locate(&self, key: &CanonicalKey) -> Result<Option<BlobPath>, StorageError> {
        if let Some(path) = self.check_path(key).await? {
            debug!(%path, "Shared pool hit");
            return Ok(Some(path));
        }

        let record = match self.check_index(key).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(key = %key, error = %e, "Index lookup failed, treating as miss");
                return Ok(None);
            }
        };

        let Ok(path) = BlobPath::parse(&record.storage_path) else {
            warn!(key = %key, path = %record.storage_path, "Indexed storage path is invalid");
            return Ok(None);
        };

        if self.blobs.exists(&path).await? {
            debug!(%path, "Index hit");
            Ok(Some(path))
        } else {
            warn!(key = %key, %path, "Indexed blob is missing");
            Ok(None)
        }
    }

    /// Write an image to `path` and return its public URL.
    pub async fn store(
        &self,
        path: &BlobPath,
        image: &GeneratedImage,
    ) -> Result<String, StorageError> {
        self.blobs
            .write(path, &image.bytes, image.format.content_type())
            .await?;
        self.blobs.make_public(path).await
    }

    /// Insert-if-absent. A `DuplicateKey` from a concurrent writer counts as
    /// already present. Keys are unique across kinds, so a row of another
    /// kind is reported rather than replaced.
    pub async fn register(
        &self,
        key: &CanonicalKey,
        path: &BlobPath,
        public_url: &str,
    ) -> Result<Registration, IndexError> {
        if let Some(existing) = self.index.find_exact(key.as_str()).await? {
            return Ok(if existing.kind == self.kind {
                Registration::AlreadyPresent
            } else {
                Registration::OtherKind(existing.kind)
            });
        }

        let new_asset = NewAsset {
            canonical_name: key.clone(),
            storage_path: path.clone(),
            public_url: public_url.to_string(),
            kind: self.kind,
        };

        match self.index.save(new_asset).await {
            Ok(id) => Ok(Registration::Inserted(id)),
            Err(IndexError::DuplicateKey(_)) => Ok(Registration::AlreadyPresent),
            Err(e) => Err(e),
        }
    }
}
