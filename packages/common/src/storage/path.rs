use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Maximum length of a blob path in bytes.
pub const MAX_PATH_LEN: usize = 512;

/// A validated, slash-separated object path such as `ingredients/tomate.jpg`.
///
/// Paths are relative, contain no empty, hidden or `..` segments, and only
/// use `[A-Za-z0-9._-]` inside segments, so they map 1:1 onto both
/// filesystem paths and object-store keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobPath(String);

impl BlobPath {
    /// Parse and validate a path string.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        let trimmed = path.trim();

        if trimmed.is_empty() {
            return Err(StorageError::InvalidPath("path cannot be empty".into()));
        }

        if trimmed.len() > MAX_PATH_LEN {
            return Err(StorageError::InvalidPath(format!(
                "path exceeds maximum length of {MAX_PATH_LEN} characters"
            )));
        }

        if trimmed.starts_with('/') || trimmed.ends_with('/') {
            return Err(StorageError::InvalidPath(
                "path must not start or end with '/'".into(),
            ));
        }

        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(StorageError::InvalidPath(
                    "path must not contain empty segments".into(),
                ));
            }
            if segment.starts_with('.') {
                return Err(StorageError::InvalidPath(
                    "path segments must not start with '.'".into(),
                ));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return Err(StorageError::InvalidPath(format!(
                    "segment '{segment}' contains invalid characters (allowed: a-zA-Z0-9, -, _, .)"
                )));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Build a path from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self::parse(&joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension. `None` when the file has no extension.
    pub fn stem(&self) -> Option<&str> {
        let (stem, _) = self.file_name().rsplit_once('.')?;
        (!stem.is_empty()).then_some(stem)
    }

    /// Lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name().rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }

    /// MIME type guessed from the extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.0)
            .first_or_octet_stream()
            .to_string()
    }

    /// Whether the path has one of the given extensions (case-insensitive).
    /// An empty filter matches everything.
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        if extensions.is_empty() {
            return true;
        }
        match self.extension() {
            Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }
}

impl fmt::Debug for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobPath({})", self.0)
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for BlobPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A blob discovered by listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: BlobPath,
    pub size: u64,
}
