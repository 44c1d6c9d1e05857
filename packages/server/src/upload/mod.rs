//! Validated, user-initiated write path.
//!
//! Unlike the generate-once caches, uploads enforce name uniqueness eagerly:
//! a taken canonical name is a [`UploadError::Conflict`] carrying the
//! existing record rather than a silent dedup.

mod request;

use std::sync::Arc;

use chrono::Utc;
use common::storage::{BlobPath, BlobStore, StorageError};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::cache::PrivateNamespace;
use crate::index::{AssetIndex, AssetRecord, IndexError, NewAsset};
use crate::kind::AssetKind;

pub use request::{
    ITEM_NAME_MAX_CHARS, ITEM_NAME_MIN_CHARS, UploadFile, UploadPolicy, UploadRequest,
};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("an asset named '{}' already exists", .existing.canonical_name)]
    Conflict { existing: Box<AssetRecord> },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn AssetIndex>,
    namespace: PrivateNamespace,
    upload_dir: String,
    policy: UploadPolicy,
}

impl UploadService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn AssetIndex>,
        namespace: PrivateNamespace,
        upload_dir: impl Into<String>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            blobs,
            index,
            namespace,
            upload_dir: upload_dir.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Store a validated upload and index it under its canonical name.
    #[instrument(skip(self, request), fields(name = %request.canonical_name(), kind = %request.kind()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<AssetRecord, UploadError> {
        let name = request.canonical_name();

        if let Some(existing) = self.index.find_exact(name.as_str()).await? {
            return Err(UploadError::Conflict {
                existing: Box::new(existing),
            });
        }

        let path = self.storage_path(&request)?;
        self.blobs
            .write(&path, request.bytes(), &path.content_type())
            .await?;
        let public_url = self.blobs.make_public(&path).await?;

        let new_asset = NewAsset {
            canonical_name: name.clone(),
            storage_path: path.clone(),
            public_url: public_url.clone(),
            kind: request.kind(),
        };

        let id = match self.index.save(new_asset).await {
            Ok(id) => id,
            Err(IndexError::DuplicateKey(_)) => return Err(self.lost_race(name.as_str()).await),
            Err(e) => return Err(e.into()),
        };

        info!(id, %path, "Stored upload");
        Ok(AssetRecord {
            id,
            canonical_name: name.to_string(),
            storage_path: path.to_string(),
            public_url,
            kind: request.kind(),
            created_at: Utc::now(),
        })
    }

    /// Owner uploads go to `<namespace>/<owner>/uploads/`, ownerless ones to
    /// the flat upload directory.
    fn storage_path(&self, request: &UploadRequest) -> Result<BlobPath, StorageError> {
        match request.owner_id() {
            Some(owner) => self
                .namespace
                .new_path(owner, AssetKind::Upload, request.extension()),
            None => BlobPath::from_segments([
                self.upload_dir.clone(),
                format!("{}.{}", Uuid::now_v7(), request.extension()),
            ]),
        }
    }

    /// A concurrent upload claimed the name between the pre-check and the insert.
    async fn lost_race(&self, name: &str) -> UploadError {
        match self.index.find_exact(name).await {
            Ok(Some(existing)) => UploadError::Conflict {
                existing: Box::new(existing),
            },
            Ok(None) => UploadError::Index(IndexError::DuplicateKey(name.to_string())),
            Err(e) => e.into(),
        }
    }
}
