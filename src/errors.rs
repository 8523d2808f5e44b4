use std::fmt;
use std::path::PathBuf;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cache operations
#[derive(Debug)]
pub enum Error {
    /// The resource loader reports that the URI does not exist
    ResourceNotFound { uri: String },

    /// The resource byte stream ended abnormally during download
    Download {
        uri: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The lock file could not be created, opened, or locked
    LockUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Any other filesystem failure
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceNotFound { uri } => {
                write!(f, "resource '{uri}' does not exist")
            }
            Error::Download { uri, source } => {
                write!(f, "failed to download resource '{uri}': {source}")
            }
            Error::LockUnavailable { path, source } => {
                write!(
                    f,
                    "failed to acquire lock on '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::Io {
                path,
                operation,
                source,
            } => {
                write!(f, "{} failed for '{}': {}", operation, path.display(), source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ResourceNotFound { .. } => None,
            Error::Download { source, .. } => Some(source.as_ref()),
            Error::LockUnavailable { source, .. } => Some(source),
            Error::Io { source, .. } => Some(source),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a resource-not-found error
    #[must_use]
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Error::ResourceNotFound { uri: uri.into() }
    }

    /// Create a download error with its underlying cause
    #[must_use]
    pub fn download(
        uri: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Download {
            uri: uri.into(),
            source: source.into(),
        }
    }

    /// Create a lock acquisition error
    #[must_use]
    pub fn lock_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::LockUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a filesystem error with the failed operation and path
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            operation,
            source,
        }
    }
}
