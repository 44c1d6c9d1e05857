use common::storage::{BlobPath, StorageError};
use uuid::Uuid;

use crate::kind::AssetKind;

/// Per-owner private blob region: `<root>/<ownerId>/<subfolder>/<uniqueId>.<ext>`.
#[derive(Debug, Clone)]
pub struct PrivateNamespace {
    root: String,
}

impl PrivateNamespace {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Fresh, never-before-used path for an owner's copy of an asset.
    pub fn new_path(
        &self,
        owner_id: &str,
        kind: AssetKind,
        extension: &str,
    ) -> Result<BlobPath, StorageError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() || owner_id.contains('/') {
            return Err(StorageError::InvalidPath(format!(
                "invalid owner id '{owner_id}'"
            )));
        }

        let file_name = format!("{}.{}", Uuid::now_v7(), extension);
        BlobPath::from_segments([
            self.root.as_str(),
            owner_id,
            kind.subfolder(),
            file_name.as_str(),
        ])
    }
}
