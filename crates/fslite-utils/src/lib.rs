//! Small building blocks shared across fslite crates.

pub mod background_runner;
pub mod file_utils;
pub mod lru_cache;
pub mod shards;

pub use background_runner::BackgroundRunner;
pub use lru_cache::LruCache;
pub use shards::Shards;
