//! External image generator contract.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::kind::AssetKind;

pub use http::HttpImageGenerator;

/// Image encodings accepted into the shared pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Extension order for shared-pool lookups. Fixed, since it decides which
    /// blob wins when both exist.
    pub const LOOKUP_ORDER: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Classify bytes by magic number, falling back to the declared content type.
    pub fn sniff(bytes: &[u8], content_type: Option<&str>) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        match content_type?.split(';').next()?.trim() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Bytes produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// What to draw.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: AssetKind,
    pub label: String,
    /// Free-form description (recipe summary, ingredient hints, ...).
    pub context: Option<String>,
}

impl GenerationRequest {
    /// Render the text prompt sent to the backend.
    pub fn prompt(&self) -> String {
        let mut prompt = match self.kind {
            AssetKind::Recipe => format!(
                "Appetizing plated dish: {}. Professional food photography, \
                 natural light, shallow depth of field.",
                self.label.trim()
            ),
            _ => format!(
                "A single {} on a clean white background. Professional food \
                 photography, natural light, high detail.",
                self.label.trim()
            ),
        };
        if let Some(context) = self.context.as_deref().map(str::trim)
            && !context.is_empty()
        {
            prompt.push_str(" Context: ");
            prompt.push_str(context);
        }
        prompt
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generator returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("unsupported image format")]
    UnsupportedFormat,
}

/// A paid, slow, non-deterministic image backend.
///
/// `Ok(None)` means the backend answered but produced no image. Callers never
/// retry.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<GeneratedImage>, GeneratorError>;
}
