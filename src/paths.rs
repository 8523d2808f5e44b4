//! Path layout and resource identity for the on-disk cache
//!
//! Every cached `(resource, version)` pair owns a directory holding
//! three sibling files: `data` (complete bytes), `download` (in-flight
//! bytes, transient) and `lock` (the cross-process rendezvous point).

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use url::Url;

const DATA_FILE_NAME: &str = "data";
const DOWNLOAD_FILE_NAME: &str = "download";
const LOCK_FILE_NAME: &str = "lock";

/// Derive the cache id for a resource URI
///
/// SHA-256 over the canonical URI string, hex-encoded. Two URIs refer
/// to the same cached resource iff their ids are equal. Deterministic
/// and independent of any cache instance.
#[must_use]
pub fn resource_id(uri: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Maps `(resource id, version)` pairs to their on-disk file triple
#[derive(Debug, Clone)]
pub(crate) struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn resource_dir(&self, resource_id: &str) -> PathBuf {
        self.root.join(resource_id)
    }

    /// Version directories are named by the version itself; eviction
    /// relies on parsing the name back
    pub(crate) fn version_dir(&self, resource_id: &str, version: i64) -> PathBuf {
        self.resource_dir(resource_id).join(version.to_string())
    }

    /// The completed, published bytes for a version
    pub(crate) fn data_file(&self, resource_id: &str, version: i64) -> PathBuf {
        self.version_dir(resource_id, version).join(DATA_FILE_NAME)
    }

    /// In-flight download target; a sibling of the data file so the
    /// publishing rename stays on one filesystem
    pub(crate) fn download_file(&self, resource_id: &str, version: i64) -> PathBuf {
        self.version_dir(resource_id, version)
            .join(DOWNLOAD_FILE_NAME)
    }

    /// Anchor of the per-version lock; outlives data and download
    pub(crate) fn lock_file(&self, resource_id: &str, version: i64) -> PathBuf {
        self.version_dir(resource_id, version).join(LOCK_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_deterministic() {
        let uri = Url::parse("https://my-server.com/path/to/config/config.xml").unwrap();
        assert_eq!(resource_id(&uri), resource_id(&uri));
        assert_eq!(resource_id(&uri).len(), 64);
    }

    #[test]
    fn test_resource_id_distinguishes_uris() {
        let a = Url::parse("https://my-server.com/config.xml").unwrap();
        let b = Url::parse("https://my-server.com/other.xml").unwrap();
        assert_ne!(resource_id(&a), resource_id(&b));
    }

    #[test]
    fn test_layout_files_share_version_dir() {
        let layout = CacheLayout::new(PathBuf::from("/cache"));
        let data = layout.data_file("abc", 1000);
        let download = layout.download_file("abc", 1000);
        let lock = layout.lock_file("abc", 1000);

        assert_eq!(data, PathBuf::from("/cache/abc/1000/data"));
        assert_eq!(download.parent(), data.parent());
        assert_eq!(lock.parent(), data.parent());
    }
}
