//! Resource loader collaborators
//!
//! The cache treats remote resources as black-box byte-stream
//! producers behind these traits; network concerns live entirely in
//! loader implementations.

use crate::errors::{Error, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use url::Url;

/// Handle to a single remote resource
pub trait Resource: Send {
    /// Whether the resource exists. May perform a network round-trip.
    fn exists(&self) -> Result<bool>;

    /// Last-modified instant in epoch milliseconds. Used verbatim as
    /// the version key for the cache, without reinterpretation.
    fn last_modified(&self) -> Result<i64>;

    /// Open the resource bytes for reading
    fn open_stream(&self) -> Result<Box<dyn Read + Send>>;
}

/// Resolves URIs to resource handles
///
/// Loaders are stateless from the cache's perspective; one loader may
/// be shared across cache instances.
pub trait ResourceLoader: Send + Sync {
    fn get_resource(&self, uri: &Url) -> Result<Box<dyn Resource>>;
}

/// Loader resolving `file://` URIs against the local filesystem
#[derive(Debug, Default)]
pub struct FileResourceLoader;

impl FileResourceLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceLoader for FileResourceLoader {
    fn get_resource(&self, uri: &Url) -> Result<Box<dyn Resource>> {
        match uri.to_file_path() {
            Ok(path) => Ok(Box::new(FileResource { path })),
            // Anything this loader cannot resolve does not exist for it
            Err(()) => Err(Error::resource_not_found(uri.as_str())),
        }
    }
}

struct FileResource {
    path: PathBuf,
}

impl Resource for FileResource {
    fn exists(&self) -> Result<bool> {
        Ok(self.path.is_file())
    }

    fn last_modified(&self) -> Result<i64> {
        let metadata = fs::metadata(&self.path)
            .map_err(|e| Error::io(&self.path, "read resource metadata", e))?;
        let modified = metadata
            .modified()
            .map_err(|e| Error::io(&self.path, "read resource mtime", e))?;
        // Files predating the epoch version as zero
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0))
    }

    fn open_stream(&self) -> Result<Box<dyn Read + Send>> {
        let file = File::open(&self.path)
            .map_err(|e| Error::download(self.path.display().to_string(), e))?;
        Ok(Box::new(file))
    }
}
