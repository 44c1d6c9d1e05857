use std::fmt;
use std::str::FromStr;

use common::{CanonicalKey, normalize, normalize_bounded};
use serde::{Deserialize, Serialize};

/// Category of a stored image. Determines folder conventions and naming rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Ingredient,
    Recipe,
    /// A user-supplied image with no shared pool.
    Upload,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Ingredient, AssetKind::Recipe, AssetKind::Upload];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingredient => "ingredient",
            Self::Recipe => "recipe",
            Self::Upload => "upload",
        }
    }

    /// Subfolder used inside an owner's private namespace.
    pub fn subfolder(&self) -> &'static str {
        match self {
            Self::Ingredient => "ingredients",
            Self::Recipe => "recipes",
            Self::Upload => "uploads",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ingredient" => Ok(Self::Ingredient),
            "recipe" => Ok(Self::Recipe),
            "upload" | "generic" => Ok(Self::Upload),
            other => Err(format!("unknown asset kind '{other}'")),
        }
    }
}

/// Default bound on recipe keys, in characters.
pub const DEFAULT_RECIPE_TITLE_MAX_LEN: usize = 50;

/// Per-kind canonical key rules. Every component that derives a key from a
/// label (caches, uploads, sync) goes through here so that the same label and
/// kind always land on the same index row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRules {
    pub recipe_title_max_len: usize,
}

impl KeyRules {
    pub fn new(recipe_title_max_len: usize) -> Self {
        Self {
            recipe_title_max_len,
        }
    }

    /// Recipe keys are bounded; all other kinds use the plain normalizer.
    pub fn key(&self, kind: AssetKind, label: &str) -> CanonicalKey {
        match kind {
            AssetKind::Recipe => normalize_bounded(label, self.recipe_title_max_len),
            AssetKind::Ingredient | AssetKind::Upload => normalize(label),
        }
    }
}

impl Default for KeyRules {
    fn default() -> Self {
        Self::new(DEFAULT_RECIPE_TITLE_MAX_LEN)
    }
}
