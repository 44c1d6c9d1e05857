use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::AssetRecord;
use crate::kind::AssetKind;

/// An Asset Index row.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AssetResponse {
    #[schema(example = 42)]
    pub id: i32,
    /// Canonical key, unique across all assets.
    #[schema(example = "tomate_cherry")]
    pub canonical_name: String,
    /// Blob path inside the configured store.
    #[schema(example = "ingredients/tomate_cherry.png")]
    pub storage_path: String,
    #[schema(example = "http://127.0.0.1:3000/blobs/ingredients/tomate_cherry.png")]
    pub public_url: String,
    pub kind: AssetKind,
    pub created_at: DateTime<Utc>,
}

impl From<AssetRecord> for AssetResponse {
    fn from(record: AssetRecord) -> Self {
        Self {
            id: record.id,
            canonical_name: record.canonical_name,
            storage_path: record.storage_path,
            public_url: record.public_url,
            kind: record.kind,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AssetListResponse {
    pub data: Vec<AssetResponse>,
}

/// Query parameters for searching assets.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AssetSearchParams {
    /// Free-form search text; normalized before matching.
    #[param(example = "tomate")]
    pub q: String,
    /// Restrict results to one kind.
    pub kind: Option<AssetKind>,
    /// Maximum number of results (1-100, default 20).
    #[param(example = 20)]
    pub limit: Option<u64>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdatePublicUrlRequest {
    #[schema(example = "https://cdn.example.com/ingredients/tomate.png")]
    pub public_url: String,
}
