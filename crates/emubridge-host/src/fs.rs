//! Filesystem access used while locating the engine.
//!
//! Every read the locator performs goes through [`Filesystem`], so tests can
//! observe (and count) what bootstrap touches. Archive extraction writes
//! through `tar` into a scratch directory and is the one exception.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Filesystem operations needed by the runtime locator.
pub trait Filesystem: Send + Sync {
    /// Whether `path` exists (following symlinks).
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory (following symlinks).
    fn is_dir(&self, path: &Path) -> bool;

    /// Entries of a directory, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Read a whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create a directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create a symbolic link at `link` pointing to `original`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; `AlreadyExists` if `link` exists.
    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()>;

    /// Open a file for streaming reads.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    #[cfg(unix)]
    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(original, link)
    }

    #[cfg(windows)]
    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        std::os::windows::fs::symlink_file(original, link)
    }

    #[cfg(not(any(unix, windows)))]
    fn symlink(&self, _original: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_dir_lists_entries() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.dll"), b"").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let mut entries = OsFilesystem.read_dir(tmp.path()).unwrap();
        entries.sort();
        assert_eq!(entries, vec![tmp.path().join("a.dll"), tmp.path().join("sub")]);
        assert!(OsFilesystem.is_dir(&tmp.path().join("sub")));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_reports_existing_link() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("lib.so");
        fs::write(&original, b"elf").unwrap();
        let link = tmp.path().join("alias.so");

        OsFilesystem.symlink(&original, &link).unwrap();
        let err = OsFilesystem.symlink(&original, &link).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&link).unwrap(), b"elf");
    }
}
