//! Runtime locator error types.

use std::path::PathBuf;

/// Errors from locating and bootstrapping the engine.
///
/// All of these are fatal to process startup; none is worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The source configuration is ambiguous or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested runtime flavor is unknown or not available for the
    /// chosen source.
    #[error(
        "unsupported runtime '{flavor}'{}; supported: {supported} (select with EMUBRIDGE_RUNTIME)",
        .source_kind.map(|k| format!(" for {k} source")).unwrap_or_default()
    )]
    UnsupportedRuntime {
        /// Requested flavor name.
        flavor: String,
        /// Source kind it was requested for, if one was chosen.
        source_kind: Option<crate::SourceKind>,
        /// Flavors that would have been accepted.
        supported: String,
    },

    /// A required file or directory does not exist or cannot be identified.
    #[error(
        "not found: {what} ({}){}",
        .path.display(),
        .hint.as_ref().map(|h| format!("; {h}")).unwrap_or_default()
    )]
    NotFound {
        /// What was being looked for.
        what: String,
        /// Path or pattern that was searched.
        path: PathBuf,
        /// How the caller can fix it.
        hint: Option<String>,
    },

    /// The host runtime or one of the engine assemblies failed to load.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// An assembly was rejected by the host runtime.
    #[error("failed to load assembly {}: {message}", .path.display())]
    AssemblyLoad {
        /// Assembly file.
        path: PathBuf,
        /// Host runtime message.
        message: String,
    },

    /// A distribution archive could not be unpacked.
    #[error("failed to extract {}: {message}", .archive.display())]
    Extraction {
        /// Archive being unpacked.
        archive: PathBuf,
        /// Failure reason.
        message: String,
    },

    /// I/O error on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

impl HostError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what: what.into(),
            path: path.into(),
            hint: None,
        }
    }

    /// Whether this error belongs to the initialization class (runtime start
    /// or assembly loading).
    #[must_use]
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization(_) | Self::AssemblyLoad { .. })
    }
}

/// Result type for runtime locator operations.
pub type HostResult<T> = Result<T, HostError>;
