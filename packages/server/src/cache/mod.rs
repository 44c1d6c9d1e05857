//! Generate-once image caches.
//!
//! Both caches resolve a label to a public URL through the same states:
//! check the shared pool, generate on a miss, write, register, and on any
//! failure fall back to a placeholder. Failures never escape
//! `get_or_generate`; they are logged as a [`Diagnostic`] first.

mod diagnostic;
mod flight;
mod ingredient;
mod namespace;
mod pool;
mod recipe;

pub use diagnostic::Diagnostic;
pub use flight::KeyedLocks;
pub use ingredient::IngredientAssetCache;
pub use namespace::PrivateNamespace;
pub use pool::{Registration, SharedPool};
pub use recipe::RecipeAssetCache;
