//! Bulk reconciliation of the Asset Index against the shared pools.

use std::sync::Arc;

use common::storage::{BlobHandle, BlobStore};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::index::{AssetIndex, IndexError, NewAsset};
use crate::kind::{AssetKind, KeyRules};

/// Extensions picked up from the shared pools.
pub const SYNC_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Per-run counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SyncReport {
    /// Records created by this run.
    pub inserted: u64,
    /// Blobs that were already indexed.
    pub existing: u64,
    /// Blobs (or whole pools) that could not be processed.
    pub failed: u64,
}

fn is_direct_child(prefix: &str, handle: &BlobHandle) -> bool {
    handle
        .path
        .as_str()
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.contains('/'))
}

enum Outcome {
    Inserted,
    Existing,
}

/// Backfills index rows for shared-pool blobs that have none.
///
/// Purely additive: never updates or deletes rows, and a failing blob is
/// logged and skipped.
pub struct SyncJob {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn AssetIndex>,
    pools: Vec<(AssetKind, String)>,
    keys: KeyRules,
}

impl SyncJob {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn AssetIndex>,
        pools: Vec<(AssetKind, String)>,
        keys: KeyRules,
    ) -> Self {
        Self {
            blobs,
            index,
            pools,
            keys,
        }
    }

    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> SyncReport {
        let mut report = SyncReport::default();

        for (kind, pool) in &self.pools {
            let prefix = format!("{}/", pool.trim_end_matches('/'));
            let handles = match self.blobs.list_by_prefix(&prefix, &SYNC_EXTENSIONS).await {
                Ok(handles) => handles,
                Err(e) => {
                    warn!(pool = %pool, error = %e, "Listing shared pool failed");
                    report.failed += 1;
                    continue;
                }
            };

            for handle in handles
                .iter()
                .filter(|h| is_direct_child(&prefix, h))
            {
                match self.sync_blob(*kind, handle).await {
                    Ok(Outcome::Inserted) => report.inserted += 1,
                    Ok(Outcome::Existing) => report.existing += 1,
                    Err(reason) => {
                        warn!(path = %handle.path, %reason, "Skipping blob");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            inserted = report.inserted,
            existing = report.existing,
            failed = report.failed,
            "Asset sync finished"
        );
        report
    }

    async fn sync_blob(&self, kind: AssetKind, handle: &BlobHandle) -> Result<Outcome, String> {
        let key = self.keys.key(kind, handle.path.stem().unwrap_or_default());
        if key.is_empty() {
            return Err("file name has no usable characters".into());
        }

        if self
            .index
            .find_exact(key.as_str())
            .await
            .map_err(|e| e.to_string())?
            .is_some()
        {
            return Ok(Outcome::Existing);
        }

        let public_url = self
            .blobs
            .make_public(&handle.path)
            .await
            .map_err(|e| e.to_string())?;

        let new_asset = NewAsset {
            canonical_name: key,
            storage_path: handle.path.clone(),
            public_url,
            kind,
        };

        match self.index.save(new_asset).await {
            Ok(id) => {
                debug!(id, path = %handle.path, "Indexed orphaned blob");
                Ok(Outcome::Inserted)
            }
            Err(IndexError::DuplicateKey(_)) => Ok(Outcome::Existing),
            Err(e) => Err(e.to_string()),
        }
    }
}
