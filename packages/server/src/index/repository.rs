use async_trait::async_trait;
use chrono::Utc;
use common::normalize;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;

use super::{AssetIndex, AssetRecord, IndexError, NewAsset};
use crate::entity::asset;
use crate::kind::AssetKind;
use crate::utils::search::{escape_like, rank_matches};

/// Upper bound on candidate rows fetched before relevance ranking.
const CANDIDATE_LIMIT: u64 = 200;

/// Asset Index backed by the `asset` table.
#[derive(Clone)]
pub struct SeaOrmAssetIndex {
    db: DatabaseConnection,
}

impl SeaOrmAssetIndex {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn candidates(
        &self,
        condition: Condition,
        kind: Option<AssetKind>,
    ) -> Result<Vec<asset::Model>, IndexError> {
        let mut select = asset::Entity::find().filter(condition);
        if let Some(kind) = kind {
            select = select.filter(asset::Column::Kind.eq(kind.as_str()));
        }

        Ok(select
            .order_by_asc(asset::Column::CanonicalName)
            .limit(CANDIDATE_LIMIT)
            .all(&self.db)
            .await?)
    }
}

fn contains(term: &str) -> Condition {
    Condition::all().add(
        Expr::expr(Func::lower(Expr::col(asset::Column::CanonicalName)))
            .like(LikeExpr::new(format!("%{}%", escape_like(term))).escape('\\')),
    )
}

impl TryFrom<asset::Model> for AssetRecord {
    type Error = IndexError;

    fn try_from(model: asset::Model) -> Result<Self, Self::Error> {
        let kind = model
            .kind
            .parse::<AssetKind>()
            .map_err(|reason| IndexError::InvalidRow {
                id: model.id,
                reason,
            })?;

        Ok(Self {
            id: model.id,
            canonical_name: model.canonical_name,
            storage_path: model.storage_path,
            public_url: model.public_url,
            kind,
            created_at: model.created_at,
        })
    }
}

#[async_trait]
impl AssetIndex for SeaOrmAssetIndex {
    async fn find_exact(&self, name: &str) -> Result<Option<AssetRecord>, IndexError> {
        let key = normalize(name);
        if key.is_empty() {
            return Ok(None);
        }

        asset::Entity::find()
            .filter(asset::Column::CanonicalName.eq(key.as_str()))
            .one(&self.db)
            .await?
            .map(AssetRecord::try_from)
            .transpose()
    }

    async fn find_similar(
        &self,
        query: &str,
        kind: Option<AssetKind>,
        limit: u64,
    ) -> Result<Vec<AssetRecord>, IndexError> {
        let key = normalize(query);
        if key.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = self.candidates(contains(key.as_str()), kind).await?;

        let words: Vec<&str> = key.as_str().split(common::naming::SEPARATOR).collect();
        if rows.is_empty() && words.len() > 1 {
            let any_word = words
                .iter()
                .fold(Condition::any(), |cond, word| cond.add(contains(word)));
            rows = self.candidates(any_word, kind).await?;
        }

        let ranked = rank_matches(key.as_str(), rows, |row| row.canonical_name.as_str());
        ranked
            .into_iter()
            .take(limit as usize)
            .map(AssetRecord::try_from)
            .collect()
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<AssetRecord>, IndexError> {
        asset::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(AssetRecord::try_from)
            .transpose()
    }

    async fn save(&self, new_asset: NewAsset) -> Result<i32, IndexError> {
        let name = new_asset.canonical_name.into_string();
        let model = asset::ActiveModel {
            canonical_name: Set(name.clone()),
            storage_path: Set(new_asset.storage_path.to_string()),
            public_url: Set(new_asset.public_url),
            kind: Set(new_asset.kind.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(inserted) => Ok(inserted.id),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(IndexError::DuplicateKey(name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_public_url(
        &self,
        id: i32,
        public_url: &str,
    ) -> Result<Option<AssetRecord>, IndexError> {
        let Some(existing) = asset::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: asset::ActiveModel = existing.into();
        active.public_url = Set(public_url.to_string());
        let updated = active.update(&self.db).await?;

        AssetRecord::try_from(updated).map(Some)
    }
}
