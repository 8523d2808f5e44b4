//! Cache configuration types

use std::path::PathBuf;

/// Configuration for the fetching cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory holding all cached resources. Must be writable
    /// and must live on a single filesystem; publication relies on
    /// same-filesystem rename atomicity.
    pub cache_dir: PathBuf,
}

impl CacheConfig {
    /// Create a configuration rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}
