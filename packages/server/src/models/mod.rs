pub mod asset;
pub mod image;
