//! The host runtime seam.

use std::path::{Path, PathBuf};

use crate::source::RuntimeFlavor;

/// How the host runtime is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeInit {
    /// Mono with its default settings.
    Mono,
    /// .NET, optionally configured by a `runtimeconfig.json` file.
    ///
    /// `None` means the file was missing and default settings apply.
    CoreClr {
        /// Runtime configuration file.
        runtime_config: Option<PathBuf>,
    },
    /// .NET from the components a single-file executable extracted.
    SelfContained {
        /// Directory acting as the .NET root.
        dotnet_root: PathBuf,
        /// `Microsoft.NETCore.App` version.
        framework_version: String,
        /// `shared/Microsoft.NETCore.App/<version>` directory.
        runtime_dir: PathBuf,
    },
}

impl RuntimeInit {
    /// Flavor this initialization starts.
    #[must_use]
    pub const fn flavor(&self) -> RuntimeFlavor {
        match self {
            Self::Mono => RuntimeFlavor::Mono,
            Self::CoreClr { .. } | Self::SelfContained { .. } => RuntimeFlavor::CoreClr,
        }
    }
}

/// The foreign host runtime.
///
/// Implementations embed the actual runtime. The locator calls
/// [`initialize`](Self::initialize) once, on the primary thread, and then
/// [`load_assembly`](Self::load_assembly) once per assembly file.
pub trait HostRuntime: Send + Sync {
    /// Start the runtime.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the bootstrap.
    fn initialize(&self, init: &RuntimeInit) -> anyhow::Result<()>;

    /// Register one assembly file with the running runtime.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the bootstrap.
    fn load_assembly(&self, path: &Path) -> anyhow::Result<()>;
}
