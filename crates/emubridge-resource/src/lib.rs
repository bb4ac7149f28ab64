//! emubridge Resource - Turns a location into a local file that exists.
//!
//! A location is either a filesystem path or an `http`/`https` URL. Paths
//! must already exist; URLs are downloaded through the engine's own
//! [`FileFetcher`] and cached per URL.
//!
//! ```rust
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use emubridge_resource::{FileFetcher, ResourceLocator, Url};
//!
//! struct Offline;
//!
//! impl FileFetcher for Offline {
//!     fn fetch(&self, _url: &Url) -> Result<PathBuf, String> {
//!         Err("offline".into())
//!     }
//! }
//!
//! let locator = ResourceLocator::new(Arc::new(Offline));
//! assert!(locator.resolve("https://example.com/a.elf").is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod locator;

pub use error::{ResourceError, ResourceResult};
pub use locator::{FileFetcher, Location, REMOTE_SCHEMES, ResourceLocator};
pub use url::Url;
