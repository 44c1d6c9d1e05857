use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::cache::{IngredientAssetCache, PrivateNamespace, RecipeAssetCache, SharedPool};
use crate::config::AppConfig;
use crate::generator::ImageGenerator;
use crate::index::{AssetIndex, SeaOrmAssetIndex};
use crate::kind::AssetKind;
use crate::sync::SyncJob;
use crate::upload::{UploadPolicy, UploadService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub blobs: Arc<dyn BlobStore>,
    pub index: Arc<dyn AssetIndex>,
    pub ingredients: Arc<IngredientAssetCache>,
    pub recipes: Arc<RecipeAssetCache>,
    pub uploads: Arc<UploadService>,
    pub sync: Arc<SyncJob>,
}

impl AppState {
    /// Wire every component from its collaborators. Called once at startup.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        blobs: Arc<dyn BlobStore>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let index: Arc<dyn AssetIndex> = Arc::new(SeaOrmAssetIndex::new(db));
        let assets = &config.assets;
        let namespace = PrivateNamespace::new(assets.user_namespace.clone());
        let keys = assets.key_rules();

        let ingredients = IngredientAssetCache::new(
            SharedPool::new(
                AssetKind::Ingredient,
                assets.ingredient_pool.clone(),
                keys,
                blobs.clone(),
                index.clone(),
            ),
            namespace.clone(),
            generator.clone(),
            assets.fallback_url.clone(),
            assets.default_image_name.clone(),
        );

        let recipes = RecipeAssetCache::new(
            SharedPool::new(
                AssetKind::Recipe,
                assets.recipe_pool.clone(),
                keys,
                blobs.clone(),
                index.clone(),
            ),
            generator,
            assets.recipe_fallback_url.clone(),
        );

        let uploads = UploadService::new(
            blobs.clone(),
            index.clone(),
            namespace,
            assets.upload_dir.clone(),
            UploadPolicy::new(&config.uploads, assets),
        );

        let sync = SyncJob::new(
            blobs.clone(),
            index.clone(),
            assets.shared_pools(),
            keys,
        );

        Self {
            config: Arc::new(config),
            blobs,
            index,
            ingredients: Arc::new(ingredients),
            recipes: Arc::new(recipes),
            uploads: Arc::new(uploads),
            sync: Arc::new(sync),
        }
    }
}
