//! Local path and URL resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ResourceError, ResourceResult};

type Slot = Arc<Mutex<Option<PathBuf>>>;

/// URL schemes fetched through the engine.
pub const REMOTE_SCHEMES: &[&str] = &["http", "https"];

/// The engine's file fetcher.
///
/// Downloads blocking the calling thread; there is no timeout at this
/// level.
pub trait FileFetcher: Send + Sync {
    /// Download `url` and return the local file holding it.
    ///
    /// # Errors
    ///
    /// A human-readable reason on failure.
    fn fetch(&self, url: &Url) -> Result<PathBuf, String>;
}

/// A parsed resource location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A filesystem path.
    Local(PathBuf),
    /// A URL with a remote scheme.
    Remote(Url),
}

impl Location {
    /// Classify `raw`.
    ///
    /// Only [`REMOTE_SCHEMES`] make a URL remote. Anything else, including
    /// strings that do not parse as URLs, is a local path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if REMOTE_SCHEMES.contains(&url.scheme()) => Self::Remote(url),
            _ => Self::Local(PathBuf::from(raw)),
        }
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Self::Local(path.to_path_buf())
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

impl From<&str> for Location {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Resolves locations to files that exist.
///
/// Successful downloads are cached per URL for the locator's lifetime;
/// failures are not, so a later call retries. Concurrent requests for one
/// URL fetch it once; different URLs download in parallel.
pub struct ResourceLocator {
    fetcher: Arc<dyn FileFetcher>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ResourceLocator {
    /// Create a locator downloading through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn FileFetcher>) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `location` to an existing local file.
    ///
    /// Local paths are returned unchanged when they exist.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotFound`] for a missing local path
    /// - [`ResourceError::Fetch`] naming the URL if the download fails or
    ///   produces no file
    pub fn resolve(&self, location: impl Into<Location>) -> ResourceResult<PathBuf> {
        match location.into() {
            Location::Local(path) => {
                if path.exists() {
                    Ok(path)
                } else {
                    Err(ResourceError::NotFound { path })
                }
            },
            Location::Remote(url) => self.fetch(&url),
        }
    }

    /// Number of cached downloads.
    #[must_use]
    pub fn cached(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_owned()).or_default())
    }

    fn fetch(&self, url: &Url) -> ResourceResult<PathBuf> {
        let key = url.as_str().to_string();
        // Only this URL's slot is held across the download.
        let slot = self.slot(&key);
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(path) = cached.as_ref() {
            if path.exists() {
                debug!(%url, path = %path.display(), "Using cached download");
                return Ok(path.clone());
            }
            warn!(%url, path = %path.display(), "Cached download vanished; fetching again");
            *cached = None;
        }

        let path = self.fetcher.fetch(url).map_err(|reason| ResourceError::Fetch {
            url: key.clone(),
            reason,
        })?;
        if !path.exists() {
            return Err(ResourceError::Fetch {
                url: key,
                reason: format!("fetcher returned missing file {}", path.display()),
            });
        }

        info!(%url, path = %path.display(), "Downloaded resource");
        *cached = Some(path.clone());
        Ok(path)
    }
}

impl std::fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLocator")
            .field("cached", &self.cached())
            .finish_non_exhaustive()
    }
}
