//! Asset Index: canonical name → shared-pool location.

mod repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CanonicalKey;
use common::storage::BlobPath;
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::kind::AssetKind;

pub use repository::SeaOrmAssetIndex;

/// Default number of rows returned by [`AssetIndex::find_similar`].
pub const DEFAULT_SIMILAR_LIMIT: u64 = 20;

/// A row of the Asset Index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub id: i32,
    pub canonical_name: String,
    pub storage_path: String,
    pub public_url: String,
    pub kind: AssetKind,
    pub created_at: DateTime<Utc>,
}

/// Values for a row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub canonical_name: CanonicalKey,
    pub storage_path: BlobPath,
    pub public_url: String,
    pub kind: AssetKind,
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// Another row already owns this canonical name.
    #[error("asset '{0}' already exists")]
    DuplicateKey(String),

    /// A stored row could not be mapped back to a record.
    #[error("invalid asset row {id}: {reason}")]
    InvalidRow { id: i32, reason: String },

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// Relational lookup of canonical asset names.
///
/// Every lookup re-normalizes its input, so callers may pass raw labels.
#[async_trait]
pub trait AssetIndex: Send + Sync {
    /// Exact, case-insensitive lookup.
    async fn find_exact(&self, name: &str) -> Result<Option<AssetRecord>, IndexError>;

    /// Substring match on the canonical name, most relevant first.
    ///
    /// Falls back to matching individual words when the whole query matches
    /// nothing. Returns an empty list when nothing matches.
    async fn find_similar(
        &self,
        query: &str,
        kind: Option<AssetKind>,
        limit: u64,
    ) -> Result<Vec<AssetRecord>, IndexError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<AssetRecord>, IndexError>;

    /// Insert a row and return its id.
    ///
    /// Fails with [`IndexError::DuplicateKey`] if the canonical name is taken.
    /// Callers check first and treat a lost race as success where appropriate.
    async fn save(&self, asset: NewAsset) -> Result<i32, IndexError>;

    /// Correct the public URL of an existing row. Returns `None` if no row
    /// has this id. This is the only supported mutation.
    async fn update_public_url(
        &self,
        id: i32,
        public_url: &str,
    ) -> Result<Option<AssetRecord>, IndexError>;
}
