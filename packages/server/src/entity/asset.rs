use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Normalized asset name. Doubles as the shared-pool filename stem.
    #[sea_orm(unique)]
    pub canonical_name: String,

    /// Blob path of the canonical copy.
    pub storage_path: String,

    pub public_url: String,

    /// One of `ingredient`, `recipe`, `upload`.
    pub kind: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
