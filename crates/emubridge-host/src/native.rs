//! Native library placement fixes.
//!
//! The POSIX helper shim ships under `runtimes/<rid>/` in .NET builds, but
//! the host runtime's loader looks for it elsewhere, and its name changed
//! between engine versions. We alias whichever file exists to where it is
//! searched for.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{HostError, HostResult};
use crate::fs::Filesystem;
use crate::platform::Platform;

/// Create `link` pointing at `original` unless something is already there.
///
/// With `relative`, the link target is expressed relative to the link's
/// directory so the tree stays valid when moved.
///
/// Returns whether a link was created.
///
/// # Errors
///
/// Returns [`HostError::Io`] for any failure other than an existing `link`.
pub fn ensure_alias(
    fs: &dyn Filesystem,
    original: &Path,
    link: &Path,
    relative: bool,
) -> HostResult<bool> {
    let target = match (relative, link.parent()) {
        (true, Some(parent)) => relative_to(original, parent),
        _ => original.to_path_buf(),
    };

    match fs.symlink(&target, link) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(HostError::io(link, e)),
    }
}

/// Alias the POSIX helper shim into place and return the managed assembly
/// that binds to it.
///
/// Newer engines ship `libMono.Unix`, which is aliased into `binaries_dir`
/// and bound by `Mono.Posix.dll`. Older ones ship `libMonoPosixHelper`,
/// aliased next to `Mono.Posix.NETStandard.dll`. Does nothing on platforms
/// without the shim.
///
/// # Errors
///
/// Returns [`HostError::Io`] if an alias cannot be created.
pub fn ensure_posix_shim(
    fs: &dyn Filesystem,
    platform: &Platform,
    binaries_dir: &Path,
) -> HostResult<Vec<PathBuf>> {
    if !platform.needs_posix_shim() {
        return Ok(Vec::new());
    }

    let ext = platform.library_ext();
    let rid_dir = binaries_dir.join("runtimes").join(platform.rid());

    let unix_lib = format!("libMono.Unix{ext}");
    let unix_src = rid_dir.join("native").join(&unix_lib);
    if fs.exists(&unix_src) {
        let link = binaries_dir.join(&unix_lib);
        if ensure_alias(fs, &unix_src, &link, false)? {
            warn!(
                src = %unix_src.display(),
                link = %link.display(),
                "{unix_lib} is not in the expected location; created alias"
            );
        }
        return Ok(vec![binaries_dir.join("Mono.Posix.dll")]);
    }

    let helper_lib = format!("libMonoPosixHelper{ext}");
    let helper_src = rid_dir.join("native").join(&helper_lib);
    let netstd_dir = rid_dir.join("lib").join("netstandard2.0");
    if !fs.exists(&helper_src) {
        warn!(
            searched = %rid_dir.display(),
            "No POSIX helper shim found; skipping native alias"
        );
        return Ok(Vec::new());
    }

    fs.create_dir_all(&netstd_dir)
        .map_err(|e| HostError::io(&netstd_dir, e))?;
    let link = netstd_dir.join(&helper_lib);
    if ensure_alias(fs, &helper_src, &link, true)? {
        warn!(
            src = %helper_src.display(),
            link = %link.display(),
            "{helper_lib} is not in the expected location; created alias"
        );
    }
    Ok(vec![netstd_dir.join("Mono.Posix.NETStandard.dll")])
}

/// `target` expressed relative to the directory `base`.
///
/// Both paths should be absolute (or both relative to the same directory).
pub(crate) fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in base.iter().skip(common) {
        relative.push("..");
    }
    for component in target.iter().skip(common) {
        relative.push(component);
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_to(
                Path::new("/r/bin/runtimes/linux-x64/native/libMonoPosixHelper.so"),
                Path::new("/r/bin/runtimes/linux-x64/lib/netstandard2.0"),
            ),
            PathBuf::from("../../native/libMonoPosixHelper.so")
        );
        assert_eq!(
            relative_to(Path::new("/x/Renode.deps.json"), Path::new("/x/shared/App/8.0.0")),
            PathBuf::from("../../../Renode.deps.json")
        );
        assert_eq!(
            relative_to(Path::new("/x/a.dll"), Path::new("/x")),
            PathBuf::from("a.dll")
        );
    }

    #[test]
    fn windows_has_no_shim() {
        let tmp = tempfile::tempdir().unwrap();
        let win = Platform::new(Os::Windows, Arch::X64);
        assert!(
            ensure_posix_shim(&crate::fs::OsFilesystem, &win, tmp.path())
                .unwrap()
                .is_empty()
        );
    }

    #[cfg(unix)]
    mod unix {
        use std::fs;

        use super::*;
        use crate::fs::OsFilesystem;

        const LINUX: Platform = Platform::new(Os::Linux, Arch::X64);

        #[test]
        fn aliases_new_shim_into_binaries_dir() {
            let tmp = tempfile::tempdir().unwrap();
            let bin = tmp.path();
            let native = bin.join("runtimes/linux-x64/native");
            fs::create_dir_all(&native).unwrap();
            fs::write(native.join("libMono.Unix.so"), b"elf").unwrap();

            let extra = ensure_posix_shim(&OsFilesystem, &LINUX, bin).unwrap();
            assert_eq!(extra, vec![bin.join("Mono.Posix.dll")]);
            assert_eq!(fs::read(bin.join("libMono.Unix.so")).unwrap(), b"elf");

            // Second run finds the alias and still succeeds.
            let again = ensure_posix_shim(&OsFilesystem, &LINUX, bin).unwrap();
            assert_eq!(again, extra);
        }

        #[test]
        fn aliases_old_shim_relatively() {
            let tmp = tempfile::tempdir().unwrap();
            let bin = tmp.path();
            let native = bin.join("runtimes/linux-x64/native");
            fs::create_dir_all(&native).unwrap();
            fs::write(native.join("libMonoPosixHelper.so"), b"elf").unwrap();

            let extra = ensure_posix_shim(&OsFilesystem, &LINUX, bin).unwrap();
            let netstd = bin.join("runtimes/linux-x64/lib/netstandard2.0");
            assert_eq!(extra, vec![netstd.join("Mono.Posix.NETStandard.dll")]);

            let link = netstd.join("libMonoPosixHelper.so");
            assert_eq!(
                fs::read_link(&link).unwrap(),
                PathBuf::from("../../native/libMonoPosixHelper.so")
            );
            assert_eq!(fs::read(&link).unwrap(), b"elf");
        }

        #[test]
        fn missing_shim_is_skipped() {
            let tmp = tempfile::tempdir().unwrap();
            assert!(
                ensure_posix_shim(&OsFilesystem, &LINUX, tmp.path())
                    .unwrap()
                    .is_empty()
            );
        }
    }
}
