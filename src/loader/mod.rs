pub mod asset;
pub mod cache;
