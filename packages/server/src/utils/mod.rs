pub mod filename;
pub mod search;
