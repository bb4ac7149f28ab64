//! Bootstrapping from a single-file executable.
//!
//! A single-file build embeds its managed assemblies and extracts them to a
//! per-user cache the first time it runs. Running it once with host tracing
//! enabled reveals that directory. The host runtime cannot load from it as
//! is, so we assemble a `shared/Microsoft.NETCore.App/<version>` tree inside
//! it out of aliases to the extracted assemblies and to the native libraries
//! shipped next to the executable.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{HostError, HostResult};
use crate::fs::Filesystem;
use crate::native::ensure_alias;
use crate::platform::Platform;

/// Dependency manifest the executable extracts.
pub const DEPS_FILE: &str = "Renode.deps.json";

/// Framework version assumed when the manifest does not name one.
pub const FALLBACK_FRAMEWORK_VERSION: &str = "8.0.0";

const FRAMEWORK_NAME: &str = "Microsoft.NETCore.App";

static EXTRACTION_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"will be extracted to \[(.*)\] directory").expect("invalid regex")
});

/// Framework version and system assemblies of the embedded runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePack {
    /// `Microsoft.NETCore.App` version.
    pub version: String,
    /// File names of the framework assemblies.
    pub system_dlls: Vec<String>,
}

/// The runtime tree built by [`prepare_shared_runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRuntime {
    /// Directory the executable extracted into; acts as the .NET root.
    pub dotnet_root: PathBuf,
    /// Framework version.
    pub version: String,
    /// `shared/Microsoft.NETCore.App/<version>` directory.
    pub runtime_dir: PathBuf,
}

/// Pull the extraction directory out of the host trace output.
#[must_use]
pub fn parse_extraction_dir(output: &str) -> Option<PathBuf> {
    EXTRACTION_DIR
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| PathBuf::from(m.as_str()))
}

/// Run `binary --version` with host tracing and return the directory it
/// extracted its assemblies to.
///
/// # Errors
///
/// Returns [`HostError::Initialization`] naming the binary if it cannot be
/// run or its output lacks the extraction directory.
pub fn probe_extraction_dir(binary: &Path) -> HostResult<PathBuf> {
    let output = Command::new(binary)
        .arg("--version")
        .env("COREHOST_TRACE", "1")
        .env("COREHOST_TRACEFILE", "")
        .output()
        .map_err(|e| {
            HostError::Initialization(format!("failed to run {}: {e}", binary.display()))
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    match parse_extraction_dir(&combined) {
        Some(dir) => {
            debug!(binary = %binary.display(), dir = %dir.display(), "Found extraction directory");
            Ok(dir)
        },
        None => Err(HostError::Initialization(format!(
            "{} --version ({}) did not report an extraction directory; is it a single-file build?",
            binary.display(),
            output.status
        ))),
    }
}

/// Read the framework version and system assembly list from the manifest.
///
/// Falls back to [`FALLBACK_FRAMEWORK_VERSION`] and every `*.dll` in
/// `extracted` when the manifest has no runtime pack for this platform.
///
/// # Errors
///
/// Returns [`HostError::Io`] if the manifest cannot be read and
/// [`HostError::Initialization`] if it is not valid JSON.
pub fn read_runtime_pack(
    fs: &dyn Filesystem,
    platform: &Platform,
    extracted: &Path,
) -> HostResult<RuntimePack> {
    let deps_path = extracted.join(DEPS_FILE);
    let content = fs
        .read_to_string(&deps_path)
        .map_err(|e| HostError::io(&deps_path, e))?;
    let deps: Value = serde_json::from_str(&content).map_err(|e| {
        HostError::Initialization(format!("invalid {}: {e}", deps_path.display()))
    })?;

    let pack_name = format!("runtimepack.{FRAMEWORK_NAME}.Runtime.{}", platform.rid());
    if let Some(pack) = find_runtime_pack(&deps, &pack_name) {
        return Ok(pack);
    }

    warn!(
        pack = %pack_name,
        version = FALLBACK_FRAMEWORK_VERSION,
        "Runtime pack not listed in {DEPS_FILE}; assuming framework version"
    );
    let mut system_dlls: Vec<String> = fs
        .read_dir(extracted)
        .map_err(|e| HostError::io(extracted, e))?
        .into_iter()
        .filter(|p| has_extension(p, "dll"))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    system_dlls.sort();
    Ok(RuntimePack {
        version: FALLBACK_FRAMEWORK_VERSION.to_string(),
        system_dlls,
    })
}

fn find_runtime_pack(deps: &Value, pack_name: &str) -> Option<RuntimePack> {
    let target_name = deps.get("runtimeTarget")?.get("name")?.as_str()?;
    let target = deps.get("targets")?.get(target_name)?.as_object()?;

    target.iter().find_map(|(library, entry)| {
        let (name, version) = library.split_once('/')?;
        if name != pack_name {
            return None;
        }
        let system_dlls = entry
            .get("runtime")
            .and_then(Value::as_object)
            .map(|runtime| runtime.keys().cloned().collect())
            .unwrap_or_default();
        Some(RuntimePack {
            version: version.to_string(),
            system_dlls,
        })
    })
}

/// Build the shared framework tree inside `extracted`.
///
/// Native libraries next to the executable, the framework assemblies, the
/// host resolver and the manifest are all aliased into place. Existing
/// aliases are kept.
///
/// # Errors
///
/// Returns [`HostError::Io`] if a directory or alias cannot be created.
pub fn prepare_shared_runtime(
    fs: &dyn Filesystem,
    platform: &Platform,
    binary_dir: &Path,
    extracted: &Path,
    pack: &RuntimePack,
) -> HostResult<SharedRuntime> {
    let runtime_dir = extracted
        .join("shared")
        .join(FRAMEWORK_NAME)
        .join(&pack.version);
    fs.create_dir_all(&runtime_dir)
        .map_err(|e| HostError::io(&runtime_dir, e))?;

    let ext = platform.library_ext().trim_start_matches('.');
    let native_libs = fs
        .read_dir(binary_dir)
        .map_err(|e| HostError::io(binary_dir, e))?
        .into_iter()
        .filter(|p| has_extension(p, ext));
    for lib in native_libs {
        if let Some(name) = lib.file_name() {
            ensure_alias(fs, &lib, &runtime_dir.join(name), false)?;
        }
    }

    for dll in &pack.system_dlls {
        ensure_alias(fs, &extracted.join(dll), &runtime_dir.join(dll), true)?;
    }

    let hostfxr = platform.hostfxr_name();
    ensure_alias(fs, &binary_dir.join(&hostfxr), &extracted.join(&hostfxr), false)?;
    ensure_alias(
        fs,
        &extracted.join(DEPS_FILE),
        &runtime_dir.join(format!("{FRAMEWORK_NAME}.deps.json")),
        true,
    )?;

    info!(
        runtime_dir = %runtime_dir.display(),
        version = %pack.version,
        assemblies = pack.system_dlls.len(),
        "Prepared shared runtime for single-file binary"
    );
    Ok(SharedRuntime {
        dotnet_root: extracted.to_path_buf(),
        version: pack.version.clone(),
        runtime_dir,
    })
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
