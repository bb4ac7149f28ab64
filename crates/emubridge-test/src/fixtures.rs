//! Test fixtures: engine trees, packages and configurations on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// Binaries directory of a default build tree, relative to its root.
pub const BUILD_OUTPUT: &str = "output/bin/Release";

/// Engine assemblies placed in fixture trees by default.
pub const ENGINE_ASSEMBLIES: &[&str] = &["Core.dll", "Peripherals.dll"];

/// Install a test subscriber writing to the test harness output.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Create a build tree with `dlls` under [`BUILD_OUTPUT`].
///
/// # Errors
///
/// Returns the I/O error if the tree cannot be written.
pub fn build_tree(dlls: &[&str]) -> io::Result<TempDir> {
    build_tree_at(BUILD_OUTPUT, dlls)
}

/// Create a build tree with `dlls` under `output` (relative to the root).
///
/// # Errors
///
/// Returns the I/O error if the tree cannot be written.
pub fn build_tree_at(output: impl AsRef<Path>, dlls: &[&str]) -> io::Result<TempDir> {
    let tmp = tempfile::tempdir()?;
    let bin = tmp.path().join(output);
    fs::create_dir_all(&bin)?;
    for dll in dlls {
        fs::write(bin.join(dll), b"MZ")?;
    }
    Ok(tmp)
}

/// Builder for distribution package archives.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    root: String,
    files: Vec<(String, Vec<u8>)>,
    gzip: bool,
}

impl PackageBuilder {
    /// Package laid out for Mono: the engine lives under `opt/renode`.
    #[must_use]
    pub fn mono() -> Self {
        Self {
            root: "opt/renode".to_string(),
            files: Vec::new(),
            gzip: true,
        }
    }

    /// Package laid out for .NET: the engine lives under `renode_<version>`.
    #[must_use]
    pub fn dotnet(version: &str) -> Self {
        Self {
            root: format!("renode_{version}"),
            files: Vec::new(),
            gzip: true,
        }
    }

    /// Add a file, relative to the engine root.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), contents.into()));
        self
    }

    /// Add assemblies to `bin/`.
    #[must_use]
    pub fn with_assemblies(mut self, dlls: &[&str]) -> Self {
        for dll in dlls {
            self = self.with_file(format!("bin/{dll}"), b"MZ".to_vec());
        }
        self
    }

    /// Write a plain tar instead of a gzip-compressed one.
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.gzip = false;
        self
    }

    /// Write the archive into `dir` and return its path.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the archive cannot be written.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let name = if self.gzip {
            "renode.pkg.tar.gz"
        } else {
            "renode.pkg.tar"
        };
        let path = dir.join(name);
        let file = fs::File::create(&path)?;
        if self.gzip {
            let encoder = self.append_all(GzEncoder::new(file, Compression::fast()))?;
            encoder.finish()?;
        } else {
            self.append_all(file)?;
        }
        Ok(path)
    }

    fn append_all<W: io::Write>(&self, writer: W) -> io::Result<W> {
        let mut builder = tar::Builder::new(writer);
        for (path, contents) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(
                &mut header,
                format!("{}/{path}", self.root),
                contents.as_slice(),
            )?;
        }
        builder.into_inner()
    }
}

/// Dependency manifest naming a linux-x64 runtime pack with `version` and
/// `system_dlls`.
#[must_use]
pub fn deps_manifest(version: &str, system_dlls: &[&str]) -> String {
    let runtime: Vec<String> = system_dlls
        .iter()
        .map(|dll| format!("\"{dll}\": {{}}"))
        .collect();
    format!(
        r#"{{
  "runtimeTarget": {{ "name": ".NETCoreApp,Version=v8.0/linux-x64" }},
  "targets": {{
    ".NETCoreApp,Version=v8.0/linux-x64": {{
      "runtimepack.Microsoft.NETCore.App.Runtime.linux-x64/{version}": {{
        "runtime": {{ {} }}
      }}
    }}
  }}
}}"#,
        runtime.join(", ")
    )
}

/// A stand-in single-file executable and the directory it "extracts" to.
#[cfg(unix)]
#[derive(Debug)]
pub struct SingleFileFixture {
    /// Holds everything below.
    pub dir: TempDir,
    /// The executable script.
    pub binary: PathBuf,
    /// Directory the script reports as its extraction directory.
    pub extracted: PathBuf,
}

/// Create a shell script that prints a host trace line naming an
/// extraction directory, filled with `system_dlls`, `dlls` and a manifest.
///
/// # Errors
///
/// Returns the I/O error if the fixture cannot be written.
#[cfg(unix)]
pub fn single_file_binary(
    version: &str,
    system_dlls: &[&str],
    dlls: &[&str],
) -> io::Result<SingleFileFixture> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let app = dir.path().join("app");
    let extracted = dir.path().join("cache").join("renode");
    fs::create_dir_all(&app)?;
    fs::create_dir_all(&extracted)?;

    for dll in system_dlls.iter().chain(dlls) {
        fs::write(extracted.join(dll), b"MZ")?;
    }
    fs::write(
        extracted.join("Renode.deps.json"),
        deps_manifest(version, system_dlls),
    )?;
    fs::write(app.join("libcoreclr.so"), b"\x7fELF")?;
    fs::write(app.join("libhostfxr.so"), b"\x7fELF")?;

    let binary = app.join("renode");
    fs::write(
        &binary,
        format!(
            "#!/bin/sh\n\
             echo 'Files embedded within the bundle will be extracted to [{}] directory' >&2\n\
             echo 'Renode v1.15.0'\n",
            extracted.display()
        ),
    )?;
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755))?;

    Ok(SingleFileFixture {
        dir,
        binary,
        extracted,
    })
}
