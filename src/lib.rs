//! Version-aware on-disk cache for remote resources
//!
//! Materializes remote resources (job configurations, dependency
//! artifacts) onto local disk under concurrent, possibly multi-process
//! contention. Each `(resource, version)` is downloaded at most once
//! per cooperating group of threads and processes sharing one cache
//! directory; publication is an atomic same-directory rename, and older
//! versions are evicted in the background without racing concurrent
//! downloads of those same versions.
//!
//! The on-disk layout is the interoperability contract between
//! cooperating processes:
//!
//! ```text
//! <cache_dir>/<resource id>/<version>/data
//! <cache_dir>/<resource id>/<version>/download
//! <cache_dir>/<resource id>/<version>/lock
//! ```

pub mod cleanup;
pub mod config;
pub mod engine;
pub mod errors;
pub mod locks;
pub mod paths;
pub mod resource;

pub use cleanup::CleanupExecutor;
pub use config::CacheConfig;
pub use engine::FetchingCache;
pub use errors::{Error, Result};
pub use locks::{FileLockFactory, ScopedLock};
pub use paths::resource_id;
pub use resource::{FileResourceLoader, Resource, ResourceLoader};
