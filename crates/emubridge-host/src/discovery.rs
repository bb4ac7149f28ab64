//! Locating the engine root and binaries directory inside a source.
//!
//! Patterns are matched one path component at a time with `globset`, and
//! every directory listing goes through [`Filesystem`].

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, info};

use crate::error::{HostError, HostResult};
use crate::fs::Filesystem;

/// Conventional binaries directory of a build tree, relative to its root.
pub const BUILD_OUTPUT_PATTERN: &str = "output/bin/Release";

/// Root of a Mono distribution package, relative to the extraction directory.
pub const MONO_PACKAGE_ROOT: &str = "opt/renode";

/// Root directory pattern of a .NET distribution package.
pub const DOTNET_PACKAGE_ROOT_PATTERN: &str = "renode*";

/// Directories under `base` matching a `/`-separated glob `pattern`.
///
/// Results are sorted. Missing intermediate directories yield no match.
///
/// # Errors
///
/// Returns [`HostError::Configuration`] if a component is not a valid glob
/// and [`HostError::Io`] if an existing directory cannot be listed.
pub fn glob_dirs(fs: &dyn Filesystem, base: &Path, pattern: &str) -> HostResult<Vec<PathBuf>> {
    let matchers = pattern
        .split('/')
        .filter(|c| !c.is_empty())
        .map(component_matcher)
        .collect::<HostResult<Vec<_>>>()?;

    let mut current = vec![base.to_path_buf()];
    for matcher in &matchers {
        let mut next = Vec::new();
        for dir in &current {
            if !fs.is_dir(dir) {
                continue;
            }
            let entries = fs.read_dir(dir).map_err(|e| HostError::io(dir, e))?;
            next.extend(entries.into_iter().filter(|entry| {
                entry
                    .file_name()
                    .is_some_and(|name| matcher.is_match(name))
                    && fs.is_dir(entry)
            }));
        }
        current = next;
    }

    current.sort();
    Ok(current)
}

fn component_matcher(component: &str) -> HostResult<GlobMatcher> {
    Glob::new(component)
        .map(|g| g.compile_matcher())
        .map_err(|e| HostError::Configuration(format!("invalid pattern '{component}': {e}")))
}

/// Find the directory holding the engine assemblies under `root`.
///
/// An explicit `build_output` (relative to `root`) must exist. Otherwise
/// exactly one directory must match [`BUILD_OUTPUT_PATTERN`].
///
/// # Errors
///
/// Returns [`HostError::NotFound`] if the override is missing or the pattern
/// matches zero or several directories. The message names the pattern and
/// the override variable.
pub fn binaries_dir(
    fs: &dyn Filesystem,
    root: &Path,
    build_output: Option<&Path>,
) -> HostResult<PathBuf> {
    let override_hint = format!(
        "set EMUBRIDGE_BUILD_OUTPUT (or source.build_output) to the binaries directory relative to {}",
        root.display()
    );

    let dir = if let Some(relative) = build_output {
        let dir = root.join(relative);
        if !fs.is_dir(&dir) {
            return Err(HostError::NotFound {
                what: "binaries directory override".into(),
                path: dir,
                hint: Some(override_hint),
            });
        }
        dir
    } else {
        let mut matches = glob_dirs(fs, root, BUILD_OUTPUT_PATTERN)?;
        if matches.len() != 1 {
            debug!(count = matches.len(), ?matches, "Binaries directory candidates");
            return Err(HostError::NotFound {
                what: format!(
                    "exactly one binaries directory matching '{BUILD_OUTPUT_PATTERN}' ({} found)",
                    matches.len()
                ),
                path: root.join(BUILD_OUTPUT_PATTERN),
                hint: Some(override_hint),
            });
        }
        matches.remove(0)
    };

    info!(dir = %dir.display(), "Using directory with engine binaries");
    Ok(dir)
}

/// The single engine root inside an extracted .NET package.
///
/// # Errors
///
/// Returns [`HostError::NotFound`] unless exactly one directory matches
/// [`DOTNET_PACKAGE_ROOT_PATTERN`].
pub fn dotnet_package_root(
    fs: &dyn Filesystem,
    extracted: &Path,
    archive: &Path,
) -> HostResult<PathBuf> {
    let mut roots = glob_dirs(fs, extracted, DOTNET_PACKAGE_ROOT_PATTERN)?;
    if roots.len() != 1 {
        return Err(HostError::NotFound {
            what: format!(
                "exactly one '{DOTNET_PACKAGE_ROOT_PATTERN}' directory in package ({} found)",
                roots.len()
            ),
            path: archive.to_path_buf(),
            hint: None,
        });
    }
    Ok(roots.remove(0))
}

/// The engine root inside an extracted Mono package.
///
/// # Errors
///
/// Returns [`HostError::NotFound`] if the package lacks [`MONO_PACKAGE_ROOT`].
pub fn mono_package_root(
    fs: &dyn Filesystem,
    extracted: &Path,
    archive: &Path,
) -> HostResult<PathBuf> {
    let root = extracted.join(MONO_PACKAGE_ROOT);
    if fs.is_dir(&root) {
        Ok(root)
    } else {
        Err(HostError::NotFound {
            what: format!("'{MONO_PACKAGE_ROOT}' directory in package"),
            path: archive.to_path_buf(),
            hint: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::fs::OsFilesystem;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for d in dirs {
            fs::create_dir_all(root.join(d)).unwrap();
        }
    }

    #[test]
    fn finds_conventional_release_dir() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["output/bin/Release", "output/bin/Debug"]);

        let dir = binaries_dir(&OsFilesystem, tmp.path(), None).unwrap();
        assert_eq!(dir, tmp.path().join("output/bin/Release"));
    }

    #[test]
    fn missing_release_dir_names_pattern_and_override() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["output/bin/Debug"]);

        let err = binaries_dir(&OsFilesystem, tmp.path(), None).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, HostError::NotFound { .. }));
        assert!(msg.contains(BUILD_OUTPUT_PATTERN), "{msg}");
        assert!(msg.contains("EMUBRIDGE_BUILD_OUTPUT"), "{msg}");
        assert!(msg.contains("0 found"), "{msg}");
    }

    #[test]
    fn override_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["output/bin/Release", "custom/bin"]);

        let dir = binaries_dir(&OsFilesystem, tmp.path(), Some(Path::new("custom/bin"))).unwrap();
        assert_eq!(dir, tmp.path().join("custom/bin"));

        let err =
            binaries_dir(&OsFilesystem, tmp.path(), Some(Path::new("nope"))).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn glob_matches_each_component() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["renode_1.14", "renode_1.15", "other"]);
        fs::write(tmp.path().join("renode.txt"), b"").unwrap();

        let found = glob_dirs(&OsFilesystem, tmp.path(), "renode*").unwrap();
        assert_eq!(
            found,
            vec![tmp.path().join("renode_1.14"), tmp.path().join("renode_1.15")]
        );
    }

    #[test]
    fn dotnet_package_needs_exactly_one_root() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["renode_1.15"]);
        let root = dotnet_package_root(&OsFilesystem, tmp.path(), Path::new("pkg.tar")).unwrap();
        assert_eq!(root, tmp.path().join("renode_1.15"));

        mkdirs(tmp.path(), &["renode_1.16"]);
        let err =
            dotnet_package_root(&OsFilesystem, tmp.path(), Path::new("pkg.tar")).unwrap_err();
        assert!(err.to_string().contains("2 found"));
    }

    #[test]
    fn mono_package_root_is_fixed() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(mono_package_root(&OsFilesystem, tmp.path(), Path::new("p.tar")).is_err());
        mkdirs(tmp.path(), &["opt/renode/bin"]);
        assert_eq!(
            mono_package_root(&OsFilesystem, tmp.path(), Path::new("p.tar")).unwrap(),
            tmp.path().join("opt/renode")
        );
    }
}
