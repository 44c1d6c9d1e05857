pub mod config;
pub mod naming;
pub mod storage;

pub use naming::{CanonicalKey, normalize, normalize_bounded};
