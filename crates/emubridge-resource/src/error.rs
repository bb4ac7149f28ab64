//! Resource locator error types.

use std::path::PathBuf;

/// Errors from resolving a resource location.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A local path does not exist.
    #[error("'{}' doesn't exist", .path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Downloading a remote resource failed.
    #[error("downloading from '{url}' failed: {reason}")]
    Fetch {
        /// The requested URL.
        url: String,
        /// Fetcher message.
        reason: String,
    },
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
