use std::sync::Arc;

use crate::config::{StorageAppConfig, StorageBackend};

mod error;
mod path;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod object;

pub use error::StorageError;
pub use path::{BlobHandle, BlobPath};
pub use traits::{BlobStore, BoxReader};

/// Construct the configured blob store backend.
pub async fn open_store(config: &StorageAppConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = filesystem::FilesystemBlobStore::new(
                config.root.clone(),
                config.public_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let s3_config = config.s3.as_ref().ok_or_else(|| {
                StorageError::Backend("storage.backend = \"s3\" requires [storage.s3]".into())
            })?;
            Ok(Arc::new(object::S3BlobStore::new(
                s3_config,
                &config.public_base_url,
            )?))
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StorageError::Backend(
            "built without the `object-storage` feature".into(),
        )),
    }
}
