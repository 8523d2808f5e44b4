//! Cache engine orchestrating fetch, publish and eviction
//!
//! All on-disk mutation for a `(resource, version)` happens inside that
//! version's scoped lock, so any two operations on the same version are
//! totally ordered. Publication is a same-directory rename of the
//! download file onto the data file; readers never observe partial
//! data. Eviction removes data and download files but retains lock
//! files, keeping the rendezvous point stable for concurrent fetchers.

use crate::cleanup::CleanupExecutor;
use crate::config::CacheConfig;
use crate::errors::{Error, Result};
use crate::locks::FileLockFactory;
use crate::paths::{resource_id, CacheLayout};
use crate::resource::{Resource, ResourceLoader};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

const CACHE_DIR_TAG: &str = "CACHEDIR.TAG";
const CACHE_DIR_TAG_CONTENT: &str = r#"Signature: 8a477f597d28d172789f06886806bc55
# This file is a cache directory tag created by fetching-cache.
# For information see https://bford.info/cachedir
"#;

/// Version-aware fetching cache for remote resources
///
/// Materializes remote resources onto local disk, downloading each
/// `(resource, version)` at most once across the threads and processes
/// that share a cache directory. After every fetch an asynchronous
/// cleanup of the resource's older versions is scheduled on the
/// executor.
pub struct FetchingCache {
    inner: Arc<CacheInner>,
    cleanup: Arc<CleanupExecutor>,
}

struct CacheInner {
    loader: Arc<dyn ResourceLoader>,
    layout: CacheLayout,
    lock_factory: Arc<FileLockFactory>,
}

impl FetchingCache {
    /// Create a cache rooted at the configured directory, creating the
    /// directory if needed
    pub fn new(
        loader: Arc<dyn ResourceLoader>,
        config: &CacheConfig,
        lock_factory: Arc<FileLockFactory>,
        cleanup: Arc<CleanupExecutor>,
    ) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)
            .map_err(|e| Error::io(&config.cache_dir, "create cache directory", e))?;

        // Tag the root for backup tools that understand cache dirs
        let tag = config.cache_dir.join(CACHE_DIR_TAG);
        if !tag.exists() {
            fs::write(&tag, CACHE_DIR_TAG_CONTENT)
                .map_err(|e| Error::io(&tag, "write cache directory tag", e))?;
        }

        Ok(Self {
            inner: Arc::new(CacheInner {
                loader,
                layout: CacheLayout::new(config.cache_dir.clone()),
                lock_factory,
            }),
            cleanup,
        })
    }

    /// Fetch `uri` into `target`, downloading only on cache miss
    ///
    /// The cached data file is copied, not renamed or linked, into
    /// `target`: the caller owns the target and may mutate or delete it
    /// independently of the cache.
    pub fn get(&self, uri: &Url, target: &Path) -> Result<()> {
        let resource = self.inner.loader.get_resource(uri)?;
        if !resource.exists()? {
            return Err(Error::resource_not_found(uri.as_str()));
        }
        let version = resource.last_modified()?;
        let id = resource_id(uri);

        self.inner.ensure_version_entry(&id, version)?;
        self.schedule_cleanup(&id, version);
        self.inner
            .lookup_or_fetch(uri, resource.as_ref(), &id, version, target)
    }

    /// Evict the data and download files of every version of
    /// `resource_id` older than `keep_version`; lock files and version
    /// directories are retained
    pub fn clean_up_older_resource_versions(
        &self,
        resource_id: &str,
        keep_version: i64,
    ) -> Result<()> {
        self.inner
            .clean_up_older_resource_versions(resource_id, keep_version)
    }

    /// Cache id of `uri`; stable across instances and processes
    #[must_use]
    pub fn resource_cache_id(&self, uri: &Url) -> String {
        resource_id(uri)
    }

    /// Path of the data file for a cached `(resource, version)`; the
    /// file exists iff the version is fully downloaded
    #[must_use]
    pub fn version_data_file(&self, resource_id: &str, version: i64) -> PathBuf {
        self.inner.layout.data_file(resource_id, version)
    }

    /// Path of the transient download file for a `(resource, version)`
    #[must_use]
    pub fn version_download_file(&self, resource_id: &str, version: i64) -> PathBuf {
        self.inner.layout.download_file(resource_id, version)
    }

    /// Path of the lock file for a `(resource, version)`
    #[must_use]
    pub fn version_lock_file(&self, resource_id: &str, version: i64) -> PathBuf {
        self.inner.layout.lock_file(resource_id, version)
    }

    /// Fire-and-forget eviction of versions older than `keep_version`;
    /// failures are logged by the worker and never reach the caller
    fn schedule_cleanup(&self, resource_id: &str, keep_version: i64) {
        let inner = Arc::clone(&self.inner);
        let resource_id = resource_id.to_owned();
        self.cleanup.submit(move || {
            if let Err(e) = inner.clean_up_older_resource_versions(&resource_id, keep_version) {
                tracing::warn!(
                    resource_id = %resource_id,
                    keep_version,
                    error = %e,
                    "background version cleanup failed"
                );
            }
        });
    }
}

impl CacheInner {
    /// Create the version directory and touch its lock file so both
    /// outlive any later eviction
    fn ensure_version_entry(&self, resource_id: &str, version: i64) -> Result<()> {
        let dir = self.layout.version_dir(resource_id, version);
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, "create version directory", e))?;

        let lock_path = self.layout.lock_file(resource_id, version);
        OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, "create lock file", e))?;
        Ok(())
    }

    fn lookup_or_fetch(
        &self,
        uri: &Url,
        resource: &dyn Resource,
        resource_id: &str,
        version: i64,
        target: &Path,
    ) -> Result<()> {
        let lock_path = self.layout.lock_file(resource_id, version);
        let _lock = self.lock_factory.get_lock(&lock_path)?;

        let data_path = self.layout.data_file(resource_id, version);
        if data_path.exists() {
            tracing::debug!(uri = %uri, version, "cache hit");
        } else {
            tracing::debug!(uri = %uri, version, "cache miss, downloading");
            self.download(uri, resource, resource_id, version)?;
        }

        fs::copy(&data_path, target)
            .map_err(|e| Error::io(target, "copy cached data to target", e))?;
        Ok(())
    }

    /// Stream the resource into the download file and atomically
    /// publish it as the data file. Caller must hold the version lock.
    fn download(
        &self,
        uri: &Url,
        resource: &dyn Resource,
        resource_id: &str,
        version: i64,
    ) -> Result<()> {
        let download_path = self.layout.download_file(resource_id, version);
        let data_path = self.layout.data_file(resource_id, version);

        let mut stream = resource.open_stream()?;

        let written = (|| -> io::Result<()> {
            // Truncates any residue left behind by a crashed attempt
            let mut file = File::create(&download_path)?;
            io::copy(&mut stream, &mut file)?;
            file.sync_all()
        })();

        if let Err(e) = written {
            // A failed attempt must not leave a stray download file
            if let Err(remove_err) = fs::remove_file(&download_path) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %download_path.display(),
                        error = %remove_err,
                        "failed to remove partial download"
                    );
                }
            }
            return Err(Error::download(uri.as_str(), e));
        }

        // Same-directory rename: publication is atomic and readers
        // never observe a partial data file
        fs::rename(&download_path, &data_path)
            .map_err(|e| Error::io(&data_path, "publish downloaded data", e))
    }

    fn clean_up_older_resource_versions(
        &self,
        resource_id: &str,
        keep_version: i64,
    ) -> Result<()> {
        let resource_dir = self.layout.resource_dir(resource_id);
        if !resource_dir.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&resource_dir)
            .map_err(|e| Error::io(&resource_dir, "read resource directory", e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::io(&resource_dir, "read resource directory entry", e))?;
            // Version directories are named by their version; anything
            // else in here is not ours to touch
            let name = entry.file_name();
            let version = match name.to_str().and_then(|name| name.parse::<i64>().ok()) {
                Some(version) => version,
                None => continue,
            };
            if version >= keep_version {
                continue;
            }
            self.delete_version(resource_id, version)?;
        }
        Ok(())
    }

    /// Delete the data and download files of one version under its
    /// lock. The lock file stays: a fetcher of the same evicted version
    /// must still rendezvous on it.
    fn delete_version(&self, resource_id: &str, version: i64) -> Result<()> {
        let lock_path = self.layout.lock_file(resource_id, version);
        let _lock = self.lock_factory.get_lock(&lock_path)?;

        for path in [
            self.layout.data_file(resource_id, version),
            self.layout.download_file(resource_id, version),
        ] {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    return Err(Error::io(&path, "delete evicted version file", e));
                }
            }
        }
        tracing::debug!(resource_id, version, "evicted resource version");
        Ok(())
    }
}
