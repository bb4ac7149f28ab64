//! Host platform identification.

use std::fmt;

use crate::error::{HostError, HostResult};

/// Operating systems the engine ships for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
}

/// CPU architectures the engine ships for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// x86-64. Also used for any architecture the engine has no build for.
    X64,
    /// 64-bit ARM.
    Arm64,
}

/// Operating system plus architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a platform description.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The platform this process runs on.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Initialization`] on an operating system the
    /// engine does not support.
    pub fn current() -> HostResult<Self> {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => {
                return Err(HostError::Initialization(format!(
                    "operating system '{other}' not recognized"
                )));
            },
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" | "arm64" => Arch::Arm64,
            _ => Arch::X64,
        };
        Ok(Self { os, arch })
    }

    /// Runtime identifier, e.g. `linux-x64`.
    #[must_use]
    pub fn rid(&self) -> String {
        let os = match self.os {
            Os::Linux => "linux",
            Os::MacOs => "osx",
            Os::Windows => "win",
        };
        let arch = match self.arch {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        };
        format!("{os}-{arch}")
    }

    /// Native shared library extension, including the dot.
    #[must_use]
    pub const fn library_ext(&self) -> &'static str {
        match self.os {
            Os::Linux => ".so",
            Os::MacOs => ".dylib",
            Os::Windows => ".dll",
        }
    }

    /// File name of the host resolver library.
    #[must_use]
    pub fn hostfxr_name(&self) -> String {
        match self.os {
            Os::Windows => "hostfxr.dll".to_string(),
            _ => format!("libhostfxr{}", self.library_ext()),
        }
    }

    /// Whether the POSIX helper shim needs aliasing on this platform.
    #[must_use]
    pub const fn needs_posix_shim(&self) -> bool {
        !matches!(self.os, Os::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rid())
    }
}
