//! Resolved bootstrap records.

use std::path::{Path, PathBuf};

use crate::runtime::RuntimeInit;
use crate::source::{RuntimeFlavor, SourceKind};

/// How and where the engine was located and initialized.
///
/// Built once by the locator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    source_kind: SourceKind,
    runtime_flavor: RuntimeFlavor,
    root_dir: PathBuf,
    binaries_dir: PathBuf,
    extra_assemblies: Vec<PathBuf>,
    init: RuntimeInit,
}

impl RuntimeDescriptor {
    pub(crate) fn new(
        source_kind: SourceKind,
        root_dir: PathBuf,
        binaries_dir: PathBuf,
        extra_assemblies: Vec<PathBuf>,
        init: RuntimeInit,
    ) -> Self {
        Self {
            source_kind,
            runtime_flavor: init.flavor(),
            root_dir,
            binaries_dir,
            extra_assemblies,
            init,
        }
    }

    /// Distribution form the engine came from.
    #[must_use]
    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    /// Host runtime flavor that was initialized.
    #[must_use]
    pub fn runtime_flavor(&self) -> RuntimeFlavor {
        self.runtime_flavor
    }

    /// Engine root directory (absolute).
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory holding the engine assemblies (absolute).
    #[must_use]
    pub fn binaries_dir(&self) -> &Path {
        &self.binaries_dir
    }

    /// Assemblies loaded in addition to the directory scan.
    #[must_use]
    pub fn extra_assemblies(&self) -> &[PathBuf] {
        &self.extra_assemblies
    }

    /// Settings the host runtime was started with.
    #[must_use]
    pub fn runtime_init(&self) -> &RuntimeInit {
        &self.init
    }
}

/// Assembly files successfully registered with the host runtime, in load
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedAssemblySet {
    paths: Vec<PathBuf>,
}

impl LoadedAssemblySet {
    pub(crate) fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Loaded files, in load order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Whether an assembly with this file name was loaded.
    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == file_name))
    }

    /// Number of loaded assemblies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over the loaded files.
    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }
}

impl<'a> IntoIterator for &'a LoadedAssemblySet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
