use common::storage::StorageError;
use thiserror::Error;

use crate::generator::GeneratorError;

/// Why a cache lookup ended in the fallback state.
#[derive(Debug, Error)]
pub enum Diagnostic {
    #[error("label normalizes to an empty key")]
    EmptyKey,

    #[error("shared pool lookup failed: {0}")]
    Lookup(StorageError),

    #[error("image generation failed: {0}")]
    Generation(#[from] GeneratorError),

    #[error("generator returned no image")]
    NoImage,

    #[error("blob write failed: {0}")]
    Write(StorageError),

    #[error("making blob public failed: {0}")]
    Publish(StorageError),
}

impl Diagnostic {
    /// Short stage name for structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptyKey => "normalize",
            Self::Lookup(_) => "check_shared",
            Self::Generation(_) | Self::NoImage => "generate",
            Self::Write(_) => "dual_write",
            Self::Publish(_) => "publish",
        }
    }
}
