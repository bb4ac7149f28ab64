//! Source selection and runtime flavor choice.
//!
//! [`SourcePlan::from_config`] turns the bootstrap configuration into one
//! source kind plus one runtime flavor. It never touches the filesystem, so
//! an ambiguous or unsupported configuration fails before any I/O happens.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use emubridge_config::BridgeConfig;
use emubridge_config::env::{EMUBRIDGE_BIN, EMUBRIDGE_BUILD_DIR, EMUBRIDGE_PKG};

use crate::error::{HostError, HostResult};

/// Distribution form the engine is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Packaged distribution archive.
    Package,
    /// Build output tree.
    BuildDir,
    /// Standalone single-file executable.
    Binary,
    /// System-wide install.
    Installed,
}

impl SourceKind {
    /// Flavors this source can be loaded with.
    #[must_use]
    pub const fn supported_flavors(self) -> &'static [RuntimeFlavor] {
        match self {
            Self::Package | Self::BuildDir => &[RuntimeFlavor::Mono, RuntimeFlavor::CoreClr],
            Self::Binary => &[RuntimeFlavor::CoreClr],
            Self::Installed => &[RuntimeFlavor::Mono],
        }
    }

    /// Flavor used when none is configured.
    #[must_use]
    pub const fn default_flavor(self) -> RuntimeFlavor {
        match self {
            Self::Binary => RuntimeFlavor::CoreClr,
            Self::Package | Self::BuildDir | Self::Installed => RuntimeFlavor::Mono,
        }
    }

    fn supported_names(self) -> String {
        self.supported_flavors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether `flavor` can load this source.
    #[must_use]
    pub fn supports(self, flavor: RuntimeFlavor) -> bool {
        self.supported_flavors().contains(&flavor)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Package => "package",
            Self::BuildDir => "build_dir",
            Self::Binary => "binary",
            Self::Installed => "installed",
        })
    }
}

/// Host runtime variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFlavor {
    /// The Mono runtime.
    Mono,
    /// .NET (`CoreCLR`).
    CoreClr,
}

impl fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mono => "mono",
            Self::CoreClr => "coreclr",
        })
    }
}

impl FromStr for RuntimeFlavor {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mono" => Ok(Self::Mono),
            "coreclr" | "dotnet" | "net" => Ok(Self::CoreClr),
            _ => Err(HostError::UnsupportedRuntime {
                flavor: s.to_string(),
                source_kind: None,
                supported: "mono, coreclr".to_string(),
            }),
        }
    }
}

/// One selected source, validated against the flavor matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePlan {
    /// Selected source kind.
    pub kind: SourceKind,
    /// Archive, build tree or binary path. `None` for the system install.
    pub location: Option<PathBuf>,
    /// Runtime flavor to initialize.
    pub flavor: RuntimeFlavor,
    /// Binaries directory override, relative to the engine root.
    pub build_output: Option<PathBuf>,
    /// Root of the system install.
    pub install_root: PathBuf,
}

impl SourcePlan {
    /// Choose the source and flavor described by `config`.
    ///
    /// # Errors
    ///
    /// - [`HostError::Configuration`] if more than one source is selected
    /// - [`HostError::UnsupportedRuntime`] if the flavor is unknown or cannot
    ///   load the selected source
    pub fn from_config(config: &BridgeConfig) -> HostResult<Self> {
        let source = &config.source;
        let selected = source.selected();
        if selected.len() > 1 {
            let vars = [EMUBRIDGE_PKG, EMUBRIDGE_BUILD_DIR, EMUBRIDGE_BIN].join(", ");
            return Err(HostError::Configuration(format!(
                "ambiguous engine source: {} are all set; select exactly one of {vars} \
                 (or `installed`)",
                selected.join(", ")
            )));
        }

        let (kind, location) = if let Some(path) = &source.package {
            (SourceKind::Package, Some(path.clone()))
        } else if let Some(path) = &source.build_dir {
            (SourceKind::BuildDir, Some(path.clone()))
        } else if let Some(path) = &source.binary {
            (SourceKind::Binary, Some(path.clone()))
        } else {
            (SourceKind::Installed, None)
        };

        let flavor = match config.runtime.as_deref() {
            Some(name) => name.parse::<RuntimeFlavor>().map_err(|_| {
                HostError::UnsupportedRuntime {
                    flavor: name.to_string(),
                    source_kind: Some(kind),
                    supported: kind.supported_names(),
                }
            })?,
            None => kind.default_flavor(),
        };

        if !kind.supports(flavor) {
            return Err(HostError::UnsupportedRuntime {
                flavor: flavor.to_string(),
                source_kind: Some(kind),
                supported: kind.supported_names(),
            });
        }

        Ok(Self {
            kind,
            location,
            flavor,
            build_output: source.build_output.clone(),
            install_root: source.effective_install_root(),
        })
    }
}
