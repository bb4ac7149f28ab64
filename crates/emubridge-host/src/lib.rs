//! emubridge Host - Locates the emulation engine and bootstraps its host runtime.
//!
//! The engine ships in four forms: a distribution package, a build output
//! tree, a single-file executable and a system-wide install. The
//! [`RuntimeLocator`] picks exactly one from the configuration, resolves
//! its directories, fixes native library placement, starts the matching
//! host runtime through a [`HostRuntime`] implementation and loads the
//! engine assemblies. This happens once per process.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use emubridge_config::BridgeConfig;
//! use emubridge_host::{HostRuntime, RuntimeInit, RuntimeLocator};
//!
//! struct Embedded;
//!
//! impl HostRuntime for Embedded {
//!     fn initialize(&self, _init: &RuntimeInit) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!     fn load_assembly(&self, _path: &Path) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let config = BridgeConfig::load()?;
//! let locator = RuntimeLocator::global(Arc::new(Embedded));
//! if let Some(descriptor) = locator.bootstrap(&config)? {
//!     println!("engine binaries in {}", descriptor.binaries_dir().display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod archive;
pub mod assemblies;
pub mod descriptor;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod fs;
pub mod locator;
pub mod native;
pub mod platform;
pub mod runtime;
pub mod single_file;
pub mod source;

pub use descriptor::{LoadedAssemblySet, RuntimeDescriptor};
pub use engine::{EngineControl, EngineInit, UiInit, UiProvider};
pub use error::{HostError, HostResult};
pub use fs::{Filesystem, OsFilesystem};
pub use locator::RuntimeLocator;
pub use platform::{Arch, Os, Platform};
pub use runtime::{HostRuntime, RuntimeInit};
pub use source::{RuntimeFlavor, SourceKind, SourcePlan};
