use std::sync::Arc;

use common::storage::{BlobPath, StorageError};
use common::CanonicalKey;
use tracing::{debug, info, instrument, warn};

use super::diagnostic::Diagnostic;
use super::flight::KeyedLocks;
use super::namespace::PrivateNamespace;
use super::pool::{Registration, SharedPool};
use crate::generator::{GeneratedImage, GenerationRequest, ImageGenerator};
use crate::kind::AssetKind;

/// Ingredient images: one shared canonical image per key, plus a private
/// copy for every owner who asks for it.
pub struct IngredientAssetCache {
    pool: SharedPool,
    namespace: PrivateNamespace,
    generator: Arc<dyn ImageGenerator>,
    fallback_url: String,
    default_image_name: String,
    flights: KeyedLocks,
}

impl IngredientAssetCache {
    pub fn new(
        pool: SharedPool,
        namespace: PrivateNamespace,
        generator: Arc<dyn ImageGenerator>,
        fallback_url: impl Into<String>,
        default_image_name: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            namespace,
            generator,
            fallback_url: fallback_url.into(),
            default_image_name: default_image_name.into(),
            flights: KeyedLocks::new(),
        }
    }

    /// Resolve an ingredient label to a public URL owned by `owner_id`.
    ///
    /// Never fails: every error is logged and replaced by the fallback URL.
    #[instrument(skip(self, context))]
    pub async fn get_or_generate(
        &self,
        label: &str,
        owner_id: &str,
        context: Option<&str>,
    ) -> String {
        match self.try_get_or_generate(label, owner_id, context).await {
            Ok(url) => url,
            Err(diagnostic) => {
                warn!(
                    stage = diagnostic.stage(),
                    label,
                    owner = owner_id,
                    error = %diagnostic,
                    "Ingredient image unavailable, using fallback"
                );
                self.fallback().await
            }
        }
    }

    /// Same as [`get_or_generate`](Self::get_or_generate) but surfaces the
    /// reason for falling back.
    pub async fn try_get_or_generate(
        &self,
        label: &str,
        owner_id: &str,
        context: Option<&str>,
    ) -> Result<String, Diagnostic> {
        let key = self.pool.key_for(label);
        if key.is_empty() {
            return Err(Diagnostic::EmptyKey);
        }

        let _flight = self.flights.acquire(&key).await;

        if let Some(shared) = self.pool.locate(&key).await.map_err(Diagnostic::Lookup)? {
            return self.copy_to_owner(&key, &shared, owner_id).await;
        }

        let request = GenerationRequest {
            kind: AssetKind::Ingredient,
            label: label.trim().to_string(),
            context: context.map(str::to_owned),
        };
        let image = self
            .generator
            .generate(&request)
            .await?
            .ok_or(Diagnostic::NoImage)?;
        info!(key = %key, bytes = image.bytes.len(), "Generated ingredient image");

        self.dual_write(&key, &image, owner_id).await
    }

    async fn copy_to_owner(
        &self,
        key: &CanonicalKey,
        shared: &BlobPath,
        owner_id: &str,
    ) -> Result<String, Diagnostic> {
        let extension = shared.extension().unwrap_or_else(|| "jpg".into());
        let blobs = self.pool.blobs();

        let owner_copy = async {
            let private = self
                .namespace
                .new_path(owner_id, AssetKind::Ingredient, &extension)?;
            blobs.copy(shared, &private).await?;
            blobs.make_public(&private).await
        };

        match owner_copy.await {
            Ok(url) => {
                debug!(key = %key, "Reused shared ingredient image");
                Ok(url)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Owner copy failed, returning shared image");
                blobs.make_public(shared).await.map_err(Diagnostic::Publish)
            }
        }
    }

    async fn dual_write(
        &self,
        key: &CanonicalKey,
        image: &GeneratedImage,
        owner_id: &str,
    ) -> Result<String, Diagnostic> {
        let shared_write = async {
            let path = self.pool.path_for(key, image.format)?;
            let url = self.pool.store(&path, image).await?;
            Ok::<_, StorageError>((path, url))
        };
        let owner_write = async {
            let path = self.namespace.new_path(
                owner_id,
                AssetKind::Ingredient,
                image.format.extension(),
            )?;
            self.pool.store(&path, image).await
        };

        let (shared, owner) = tokio::join!(shared_write, owner_write);

        let shared_url = match shared {
            Ok((path, url)) => {
                self.register(key, &path, &url).await;
                Some(url)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Shared pool write failed");
                None
            }
        };

        match (owner, shared_url) {
            (Ok(url), _) => Ok(url),
            (Err(e), Some(url)) => {
                warn!(key = %key, error = %e, "Owner write failed, returning shared image");
                Ok(url)
            }
            (Err(e), None) => Err(Diagnostic::Write(e)),
        }
    }

    async fn register(&self, key: &CanonicalKey, path: &BlobPath, url: &str) {
        match self.pool.register(key, path, url).await {
            Ok(Registration::Inserted(id)) => debug!(key = %key, id, "Registered ingredient"),
            Ok(Registration::AlreadyPresent) => debug!(key = %key, "Ingredient already indexed"),
            Ok(Registration::OtherKind(existing)) => warn!(
                key = %key,
                existing_kind = %existing,
                "Ingredient key already indexed under another kind"
            ),
            Err(e) => warn!(key = %key, error = %e, "Index registration failed"),
        }
    }

    /// URL of the reserved default-image record, else the fixed placeholder.
    async fn fallback(&self) -> String {
        match self.pool.index().find_exact(&self.default_image_name).await {
            Ok(Some(record)) if !record.public_url.is_empty() => record.public_url,
            Ok(_) => self.fallback_url.clone(),
            Err(e) => {
                warn!(error = %e, "Default image lookup failed");
                self.fallback_url.clone()
            }
        }
    }
}
