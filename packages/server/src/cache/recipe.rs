use std::sync::Arc;

use common::CanonicalKey;
use tracing::{debug, info, instrument, warn};

use super::diagnostic::Diagnostic;
use super::flight::KeyedLocks;
use super::pool::{Registration, SharedPool};
use crate::generator::{GenerationRequest, ImageGenerator};
use crate::kind::AssetKind;

/// Recipe images: one shared image per normalized title, served to every
/// owner. Has no owner namespace.
pub struct RecipeAssetCache {
    pool: SharedPool,
    generator: Arc<dyn ImageGenerator>,
    fallback_url: String,
    flights: KeyedLocks,
}

impl RecipeAssetCache {
    pub fn new(
        pool: SharedPool,
        generator: Arc<dyn ImageGenerator>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            generator,
            fallback_url: fallback_url.into(),
            flights: KeyedLocks::new(),
        }
    }

    /// Canonical key for a recipe title, bounded in length.
    pub fn key_for(&self, title: &str) -> CanonicalKey {
        self.pool.key_for(title)
    }

    /// Resolve a recipe title to its shared public URL. Never fails.
    #[instrument(skip(self, context))]
    pub async fn get_or_generate(&self, title: &str, context: Option<&str>) -> String {
        match self.try_get_or_generate(title, context).await {
            Ok(url) => url,
            Err(diagnostic) => {
                warn!(
                    stage = diagnostic.stage(),
                    title,
                    error = %diagnostic,
                    "Recipe image unavailable, using fallback"
                );
                self.fallback_url.clone()
            }
        }
    }

    pub async fn try_get_or_generate(
        &self,
        title: &str,
        context: Option<&str>,
    ) -> Result<String, Diagnostic> {
        let key = self.key_for(title);
        if key.is_empty() {
            return Err(Diagnostic::EmptyKey);
        }

        let _flight = self.flights.acquire(&key).await;

        let blobs = self.pool.blobs();
        if let Some(shared) = self.pool.locate(&key).await.map_err(Diagnostic::Lookup)? {
            debug!(key = %key, "Reused shared recipe image");
            return blobs.make_public(&shared).await.map_err(Diagnostic::Publish);
        }

        let request = GenerationRequest {
            kind: AssetKind::Recipe,
            label: title.trim().to_string(),
            context: context.map(str::to_owned),
        };
        let image = self
            .generator
            .generate(&request)
            .await?
            .ok_or(Diagnostic::NoImage)?;
        info!(key = %key, bytes = image.bytes.len(), "Generated recipe image");

        let path = self
            .pool
            .path_for(&key, image.format)
            .map_err(Diagnostic::Write)?;
        blobs
            .write(&path, &image.bytes, image.format.content_type())
            .await
            .map_err(Diagnostic::Write)?;
        let url = blobs.make_public(&path).await.map_err(Diagnostic::Publish)?;

        match self.pool.register(&key, &path, &url).await {
            Ok(Registration::Inserted(id)) => debug!(key = %key, id, "Registered recipe"),
            Ok(Registration::AlreadyPresent) => debug!(key = %key, "Recipe already indexed"),
            Ok(Registration::OtherKind(existing)) => warn!(
                key = %key,
                existing_kind = %existing,
                "Recipe key already indexed under another kind"
            ),
            Err(e) => warn!(key = %key, error = %e, "Index registration failed"),
        }

        Ok(url)
    }
}
