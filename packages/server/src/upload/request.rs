use common::{CanonicalKey, normalize};

use super::UploadError;
use crate::config::{AssetConfig, UploadConfig};
use crate::kind::{AssetKind, KeyRules};
use crate::utils::filename::upload_extension;

pub const ITEM_NAME_MIN_CHARS: usize = 2;
pub const ITEM_NAME_MAX_CHARS: usize = 100;
pub const OWNER_ID_MAX_CHARS: usize = 64;

/// Raw file part of an upload as received from the client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Limits applied by [`UploadRequest::new`].
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_kinds: Vec<AssetKind>,
    /// Same rules the caches use, so an upload collides with a generated
    /// asset of the same name.
    pub keys: KeyRules,
}

impl UploadPolicy {
    pub fn new(uploads: &UploadConfig, assets: &AssetConfig) -> Self {
        Self {
            max_size_bytes: uploads.max_size_bytes,
            allowed_extensions: uploads
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            allowed_kinds: uploads.allowed_kinds.clone(),
            keys: assets.key_rules(),
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(&UploadConfig::default(), &AssetConfig::default())
    }
}

/// A validated user upload. Only constructible through [`UploadRequest::new`].
#[derive(Debug, Clone)]
pub struct UploadRequest {
    bytes: Vec<u8>,
    extension: String,
    item_name: String,
    canonical_name: CanonicalKey,
    kind: AssetKind,
    owner_id: Option<String>,
}

impl UploadRequest {
    /// Validate raw input, failing on the first violated rule.
    ///
    /// Order: file present and named, extension allowed, size within limit,
    /// item name length, kind allowed, owner id well-formed.
    pub fn new(
        file: Option<UploadFile>,
        owner_id: Option<&str>,
        item_name: &str,
        kind: &str,
        policy: &UploadPolicy,
    ) -> Result<Self, UploadError> {
        let file = file.ok_or_else(|| UploadError::Validation("File is required".into()))?;
        if file.bytes.is_empty() {
            return Err(UploadError::Validation("File must not be empty".into()));
        }
        let extension = upload_extension(file.filename.as_deref().unwrap_or_default())
            .map_err(|e| UploadError::Validation(e.message().into()))?;

        if !policy.allowed_extensions.iter().any(|ext| *ext == extension) {
            return Err(UploadError::Validation(format!(
                "File extension '.{extension}' is not allowed (allowed: {})",
                policy.allowed_extensions.join(", ")
            )));
        }

        let size = file.bytes.len() as u64;
        if size > policy.max_size_bytes {
            return Err(UploadError::Validation(format!(
                "File is {size} bytes, maximum is {} bytes",
                policy.max_size_bytes
            )));
        }

        let item_name = item_name.trim();
        let name_len = item_name.chars().count();
        if !(ITEM_NAME_MIN_CHARS..=ITEM_NAME_MAX_CHARS).contains(&name_len) {
            return Err(UploadError::Validation(format!(
                "Item name must be {ITEM_NAME_MIN_CHARS}-{ITEM_NAME_MAX_CHARS} characters"
            )));
        }
        let item_name = item_name.to_lowercase();
        if normalize(&item_name).is_empty() {
            return Err(UploadError::Validation(
                "Item name must contain letters or digits".into(),
            ));
        }

        let kind = kind
            .parse::<AssetKind>()
            .map_err(UploadError::Validation)?;
        if !policy.allowed_kinds.contains(&kind) {
            return Err(UploadError::Validation(format!(
                "Kind '{kind}' is not allowed for uploads"
            )));
        }
        let canonical_name = policy.keys.key(kind, &item_name);

        let owner_id = match owner_id.map(str::trim) {
            None | Some("") => None,
            Some(id) => Some(validate_owner_id(id)?.to_string()),
        };

        Ok(Self {
            bytes: file.bytes,
            extension,
            item_name,
            canonical_name,
            kind,
            owner_id,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lower-cased file extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Trimmed, lower-cased item name.
    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn canonical_name(&self) -> &CanonicalKey {
        &self.canonical_name
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }
}

/// Owner ids become a path segment, so only `[A-Za-z0-9_-]` is accepted.
fn validate_owner_id(id: &str) -> Result<&str, UploadError> {
    let valid = id.len() <= OWNER_ID_MAX_CHARS
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(id)
    } else {
        Err(UploadError::Validation(format!(
            "Owner id must be 1-{OWNER_ID_MAX_CHARS} characters of a-z, A-Z, 0-9, '-' or '_'"
        )))
    }
}
