//! Assembly loading.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::descriptor::LoadedAssemblySet;
use crate::error::{HostError, HostResult};
use crate::fs::Filesystem;
use crate::runtime::HostRuntime;

/// Assemblies that must never be loaded directly.
///
/// The runtime's own core library fails to load explicitly, and the
/// Windows interop shims are pulled in transitively but are rejected as bad
/// images when loaded on their own.
pub const DENIED_ASSEMBLIES: &[&str] = &["System.Private.CoreLib.dll", "sni.dll", "hostfxr.dll"];

/// Suffix of .NET Core interop shims that are never loaded directly.
pub const DENIED_SUFFIX: &str = "_cor3.dll";

/// Whether a file name is on the deny list.
#[must_use]
pub fn is_denied(file_name: &str) -> bool {
    DENIED_ASSEMBLIES.contains(&file_name) || file_name.contains(DENIED_SUFFIX)
}

/// Assemblies to load: every `*.dll` in `binaries_dir` (sorted) followed by
/// `extras`.
///
/// Relative extras resolve against `binaries_dir`. Missing files, denied
/// names and duplicates are dropped.
///
/// # Errors
///
/// Returns [`HostError::Io`] if `binaries_dir` cannot be listed.
pub fn collect(
    fs: &dyn Filesystem,
    binaries_dir: &Path,
    extras: &[PathBuf],
) -> HostResult<Vec<PathBuf>> {
    let mut scanned: Vec<PathBuf> = fs
        .read_dir(binaries_dir)
        .map_err(|e| HostError::io(binaries_dir, e))?
        .into_iter()
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"))
        })
        .collect();
    scanned.sort();

    let mut selected: Vec<PathBuf> = Vec::with_capacity(scanned.len().saturating_add(extras.len()));
    for path in scanned
        .into_iter()
        .chain(extras.iter().map(|e| binaries_dir.join(e)))
    {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_denied(&name) {
            debug!(assembly = %name, "Skipping denied assembly");
            continue;
        }
        if !fs.exists(&path) {
            debug!(assembly = %path.display(), "Skipping missing assembly");
            continue;
        }
        if !selected.contains(&path) {
            selected.push(path);
        }
    }
    Ok(selected)
}

/// Register each assembly with the host runtime, in order.
///
/// # Errors
///
/// Returns [`HostError::AssemblyLoad`] for the first assembly the runtime
/// rejects. Nothing after it is loaded.
pub fn load_all(host: &dyn HostRuntime, paths: Vec<PathBuf>) -> HostResult<LoadedAssemblySet> {
    let mut loaded = LoadedAssemblySet::default();
    for path in paths {
        host.load_assembly(&path)
            .map_err(|e| HostError::AssemblyLoad {
                path: path.clone(),
                message: format!("{e:#}"),
            })?;
        debug!(assembly = %path.display(), "Loaded assembly");
        loaded.push(path);
    }
    info!(count = loaded.len(), "Loaded engine assemblies");
    Ok(loaded)
}
