//! Distribution archive extraction.
//!
//! Packages are plain or gzip-compressed tarballs; compression is detected
//! from the first bytes, not the file name. Entries are unpacked into a
//! fresh scratch directory while guarding against:
//! - Path traversal (`../` components) and absolute paths
//! - Excessive entry counts and extracted sizes
//!
//! Link and device entries are skipped. The engine never needs them at load
//! time and they are the usual way out of the scratch directory.

use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{HostError, HostResult};
use crate::fs::Filesystem;

/// Maximum number of entries in a distribution archive.
const MAX_ENTRY_COUNT: usize = 100_000;

/// Maximum total extracted size (4 GB).
const MAX_EXTRACTED_SIZE: u64 = 4_000_000_000;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Unpack `archive` into a new scratch directory.
///
/// The directory is removed when the returned [`TempDir`] is dropped or
/// closed.
///
/// # Errors
///
/// Returns [`HostError::Io`] if the archive cannot be opened and
/// [`HostError::Extraction`] on malformed, empty, oversized or unsafe
/// archives.
pub fn extract(fs: &dyn Filesystem, archive: &Path) -> HostResult<TempDir> {
    let file = fs.open(archive).map_err(|e| HostError::io(archive, e))?;
    let mut reader = BufReader::new(file);
    let head = reader.fill_buf().map_err(|e| HostError::io(archive, e))?;
    let gzipped = head.starts_with(&GZIP_MAGIC);

    let stream: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    let scratch = tempfile::Builder::new()
        .prefix("emubridge-pkg-")
        .tempdir()
        .map_err(|e| HostError::io(std::env::temp_dir(), e))?;

    let count = unpack(stream, archive, scratch.path())?;
    info!(
        archive = %archive.display(),
        dest = %scratch.path().display(),
        entries = count,
        gzipped,
        "Extracted engine package"
    );
    Ok(scratch)
}

fn unpack(stream: impl Read, archive: &Path, dest: &Path) -> HostResult<usize> {
    let fail = |message: String| HostError::Extraction {
        archive: archive.to_path_buf(),
        message,
    };

    let mut tar = Archive::new(stream);
    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;

    let entries = tar
        .entries()
        .map_err(|e| fail(format!("failed to read archive entries: {e}")))?;

    for entry_result in entries {
        let mut entry =
            entry_result.map_err(|e| fail(format!("failed to read archive entry: {e}")))?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(fail(format!(
                "archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"
            )));
        }

        let entry_path = entry
            .path()
            .map_err(|e| fail(format!("failed to read entry path: {e}")))?
            .into_owned();

        let entry_type = entry.header().entry_type();
        if !is_extractable(entry_type) {
            debug!(entry = %entry_path.display(), ?entry_type, "Skipping archive entry");
            continue;
        }

        total_size = total_size.saturating_add(entry.header().size().unwrap_or(0));
        if total_size > MAX_EXTRACTED_SIZE {
            return Err(fail(format!(
                "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
            )));
        }

        if !is_contained(&entry_path) {
            return Err(fail(format!(
                "entry '{}' escapes the extraction directory",
                entry_path.display()
            )));
        }

        entry
            .unpack_in(dest)
            .map_err(|e| fail(format!("failed to unpack {}: {e}", entry_path.display())))?;
    }

    if entry_count == 0 {
        return Err(fail("archive is empty".into()));
    }
    Ok(entry_count)
}

fn is_extractable(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::Regular | EntryType::Continuous | EntryType::Directory
    )
}

/// Whether a relative entry path stays below the extraction root.
fn is_contained(path: &Path) -> bool {
    !path.is_absolute()
        && path.components().all(|c| {
            !matches!(
                c,
                Component::ParentDir | Component::Prefix(_) | Component::RootDir
            )
        })
}
