pub mod assets;
pub mod blobs;
pub mod images;
