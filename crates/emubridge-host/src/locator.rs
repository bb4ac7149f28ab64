//! The runtime locator.
//!
//! [`RuntimeLocator::resolve`] finds the engine, starts the host runtime and
//! loads the engine assemblies. Only the first call does any work; every
//! later call returns the same [`RuntimeDescriptor`].
//!
//! The sequence for the first call:
//! 1. Pick one source and a runtime flavor from the configuration (no I/O)
//! 2. Materialize the engine root (extract, use in place, or probe)
//! 3. Find the binaries directory
//! 4. Fix native library placement for .NET sources
//! 5. Start the host runtime
//! 6. Load every assembly, minus the deny list
//! 7. Register teardown tasks

use std::any::type_name;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use emubridge_config::BridgeConfig;
use emubridge_core::{Cleaner, OffThreadHook, ServiceRegistry, mark_primary_thread, priority};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::assemblies;
use crate::descriptor::{LoadedAssemblySet, RuntimeDescriptor};
use crate::discovery;
use crate::error::{HostError, HostResult};
use crate::fs::{Filesystem, OsFilesystem};
use crate::native;
use crate::platform::Platform;
use crate::runtime::{HostRuntime, RuntimeInit};
use crate::single_file;
use crate::source::{RuntimeFlavor, SourceKind, SourcePlan};

/// Host runtime configuration file inside the binaries directory.
pub const RUNTIME_CONFIG_FILE: &str = "Renode.runtimeconfig.json";

/// Entry assembly loaded in addition to the directory scan under Mono.
pub const MONO_ENTRY_ASSEMBLY: &str = "Renode.exe";

/// Name of the engine executable looked up on `PATH` for installed sources.
pub const INSTALLED_EXECUTABLE: &str = "renode";

struct Bootstrapped {
    config: BridgeConfig,
    descriptor: Arc<RuntimeDescriptor>,
    assemblies: Arc<LoadedAssemblySet>,
}

/// Everything resolved before the host runtime starts.
struct Layout {
    root_dir: PathBuf,
    binaries_dir: PathBuf,
    extra_assemblies: Vec<PathBuf>,
    init: RuntimeInit,
    scratch: Option<TempDir>,
}

/// Locates and bootstraps the engine once per process.
pub struct RuntimeLocator {
    host: Arc<dyn HostRuntime>,
    fs: Arc<dyn Filesystem>,
    platform: Option<Platform>,
    cleaner: Arc<Cleaner>,
    off_thread_hook: OffThreadHook,
    state: Mutex<Option<Bootstrapped>>,
    /// Set once `HostRuntime::initialize` succeeded, even if the rest of the
    /// bootstrap failed afterwards.
    runtime_started: AtomicBool,
}

impl RuntimeLocator {
    /// Create a locator driving `host`, using the real filesystem, the
    /// current platform and the global [`Cleaner`].
    #[must_use]
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self {
            host,
            fs: Arc::new(OsFilesystem),
            platform: None,
            cleaner: Cleaner::global(),
            off_thread_hook: Arc::new(warn_off_thread),
            state: Mutex::new(None),
            runtime_started: AtomicBool::new(false),
        }
    }

    /// Use a different filesystem.
    #[must_use]
    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Pretend to run on `platform`.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Register teardown tasks with `cleaner` instead of the global one.
    #[must_use]
    pub fn with_cleaner(mut self, cleaner: Arc<Cleaner>) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Replace the diagnostic fired when bootstrapping off the primary thread.
    ///
    /// The hook receives the type name of the descriptor being built.
    #[must_use]
    pub fn with_off_thread_hook(
        mut self,
        hook: impl Fn(&'static str) + Send + Sync + 'static,
    ) -> Self {
        self.off_thread_hook = Arc::new(hook);
        self
    }

    /// The process-wide locator.
    ///
    /// `host` is only used by the first call; later calls return the
    /// existing locator unchanged.
    pub fn global(host: Arc<dyn HostRuntime>) -> Arc<Self> {
        ServiceRegistry::global().get_or_create(|| Self::new(host))
    }

    /// Locate and bootstrap the engine, or return the existing descriptor.
    ///
    /// A call after a successful bootstrap performs no I/O and returns the
    /// same descriptor even when `config` differs from the first one; the
    /// difference is logged.
    ///
    /// # Errors
    ///
    /// - [`HostError::Configuration`] for ambiguous sources, before any
    ///   filesystem access
    /// - [`HostError::UnsupportedRuntime`] for a flavor the source cannot use
    /// - [`HostError::NotFound`] for missing sources or directories
    /// - [`HostError::Initialization`] / [`HostError::AssemblyLoad`] if the
    ///   host runtime or an assembly fails to load
    /// - [`HostError::Initialization`] on every call after a bootstrap that
    ///   started the host runtime and then failed; the runtime is never
    ///   initialized twice
    pub fn resolve(&self, config: &BridgeConfig) -> HostResult<Arc<RuntimeDescriptor>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(done) = state.as_ref() {
            if done.config != *config {
                warn!("Engine already bootstrapped with a different configuration; keeping it");
            }
            return Ok(Arc::clone(&done.descriptor));
        }

        if self.runtime_started.load(Ordering::SeqCst) {
            return Err(HostError::Initialization(
                "host runtime already initialized by a failed bootstrap".into(),
            ));
        }

        let plan = SourcePlan::from_config(config)?;
        if !mark_primary_thread() {
            (self.off_thread_hook)(type_name::<RuntimeDescriptor>());
        }

        let platform = match self.platform {
            Some(platform) => platform,
            None => Platform::current()?,
        };
        info!(source = %plan.kind, flavor = %plan.flavor, %platform, "Bootstrapping engine");

        let layout = self.layout(&plan, &platform)?;
        self.start_runtime(&layout)?;
        self.runtime_started.store(true, Ordering::SeqCst);

        let paths = assemblies::collect(
            self.fs.as_ref(),
            &layout.binaries_dir,
            &layout.extra_assemblies,
        )?;
        let loaded = assemblies::load_all(self.host.as_ref(), paths)?;

        let Layout {
            root_dir,
            binaries_dir,
            extra_assemblies,
            init,
            scratch,
        } = layout;

        if let Some(scratch) = scratch {
            self.cleaner
                .register(priority::REMOVE_SCRATCH, "remove-package-scratch", move || {
                    let path = scratch.path().to_path_buf();
                    scratch
                        .close()
                        .with_context(|| format!("failed to remove {}", path.display()))
                });
        }

        let descriptor = Arc::new(RuntimeDescriptor::new(
            plan.kind,
            root_dir,
            binaries_dir,
            extra_assemblies,
            init,
        ));
        info!(
            root = %descriptor.root_dir().display(),
            binaries = %descriptor.binaries_dir().display(),
            assemblies = loaded.len(),
            "Engine bootstrapped"
        );

        *state = Some(Bootstrapped {
            config: config.clone(),
            descriptor: Arc::clone(&descriptor),
            assemblies: Arc::new(loaded),
        });
        Ok(descriptor)
    }

    /// Bootstrap unless the configuration asks to skip it.
    ///
    /// Returns `None` without touching anything when `skip_bootstrap` is
    /// set, i.e. the embedding process already loaded the engine.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn bootstrap(&self, config: &BridgeConfig) -> HostResult<Option<Arc<RuntimeDescriptor>>> {
        if config.skip_bootstrap {
            debug!("Engine bootstrap skipped by configuration");
            return Ok(None);
        }
        self.resolve(config).map(Some)
    }

    /// Whether the engine has been bootstrapped.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The resolved descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Initialization`] before the first successful
    /// [`resolve`](Self::resolve).
    pub fn descriptor(&self) -> HostResult<Arc<RuntimeDescriptor>> {
        self.with_state(|done| Arc::clone(&done.descriptor))
    }

    /// Assemblies registered with the host runtime.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Initialization`] before the first successful
    /// [`resolve`](Self::resolve).
    pub fn loaded_assemblies(&self) -> HostResult<Arc<LoadedAssemblySet>> {
        self.with_state(|done| Arc::clone(&done.assemblies))
    }

    /// Run `f` with the working directory set to the engine root, then
    /// restore it.
    ///
    /// Engine scripts refer to platform files relative to the root.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Initialization`] before the first successful
    /// [`resolve`](Self::resolve) and [`HostError::Io`] if the working
    /// directory cannot be changed.
    pub fn with_root_dir<R>(&self, f: impl FnOnce() -> R) -> HostResult<R> {
        let root = self.descriptor()?.root_dir().to_path_buf();
        in_dir(&root, f)
    }

    fn with_state<R>(&self, f: impl FnOnce(&Bootstrapped) -> R) -> HostResult<R> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .as_ref()
            .map(f)
            .ok_or_else(|| HostError::Initialization("engine has not been bootstrapped".into()))
    }

    fn layout(&self, plan: &SourcePlan, platform: &Platform) -> HostResult<Layout> {
        match plan.kind {
            SourceKind::Package => self.package_layout(plan, platform),
            SourceKind::BuildDir => self.build_layout(plan, platform),
            SourceKind::Binary => self.binary_layout(plan, platform),
            SourceKind::Installed => self.installed_layout(plan),
        }
    }

    fn package_layout(&self, plan: &SourcePlan, platform: &Platform) -> HostResult<Layout> {
        let archive = required_location(plan)?;
        if !self.fs.exists(&archive) {
            return Err(HostError::NotFound {
                what: "engine package".into(),
                path: archive,
                hint: Some("check EMUBRIDGE_PKG (or source.package)".into()),
            });
        }

        let scratch = crate::archive::extract(self.fs.as_ref(), &archive)?;
        let root_dir = match plan.flavor {
            RuntimeFlavor::Mono => {
                discovery::mono_package_root(self.fs.as_ref(), scratch.path(), &archive)?
            },
            RuntimeFlavor::CoreClr => {
                discovery::dotnet_package_root(self.fs.as_ref(), scratch.path(), &archive)?
            },
        };
        let binaries_dir = root_dir.join("bin");

        let mut layout = self.flavored_layout(plan.flavor, platform, root_dir, binaries_dir)?;
        layout.scratch = Some(scratch);
        Ok(layout)
    }

    fn build_layout(&self, plan: &SourcePlan, platform: &Platform) -> HostResult<Layout> {
        let root_dir = absolute(&required_location(plan)?)?;
        if !self.fs.is_dir(&root_dir) {
            return Err(HostError::NotFound {
                what: "engine build directory".into(),
                path: root_dir,
                hint: Some("check EMUBRIDGE_BUILD_DIR (or source.build_dir)".into()),
            });
        }
        let binaries_dir =
            discovery::binaries_dir(self.fs.as_ref(), &root_dir, plan.build_output.as_deref())?;
        self.flavored_layout(plan.flavor, platform, root_dir, binaries_dir)
    }

    fn binary_layout(&self, plan: &SourcePlan, platform: &Platform) -> HostResult<Layout> {
        let binary = absolute(&required_location(plan)?)?;
        if !self.fs.exists(&binary) {
            return Err(HostError::NotFound {
                what: "engine executable".into(),
                path: binary,
                hint: Some("check EMUBRIDGE_BIN (or source.binary)".into()),
            });
        }
        let root_dir = binary
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| HostError::not_found("directory of engine executable", &binary))?;

        let extracted = absolute(&single_file::probe_extraction_dir(&binary)?)?;
        let pack = single_file::read_runtime_pack(self.fs.as_ref(), platform, &extracted)?;
        let shared = single_file::prepare_shared_runtime(
            self.fs.as_ref(),
            platform,
            &root_dir,
            &extracted,
            &pack,
        )?;

        Ok(Layout {
            root_dir,
            binaries_dir: extracted,
            extra_assemblies: Vec::new(),
            init: RuntimeInit::SelfContained {
                dotnet_root: shared.dotnet_root,
                framework_version: shared.version,
                runtime_dir: shared.runtime_dir,
            },
            scratch: None,
        })
    }

    fn installed_layout(&self, plan: &SourcePlan) -> HostResult<Layout> {
        let executable = which::which(INSTALLED_EXECUTABLE).map_err(|e| HostError::NotFound {
            what: format!("'{INSTALLED_EXECUTABLE}' on PATH ({e})"),
            path: PathBuf::from(INSTALLED_EXECUTABLE),
            hint: Some(
                "install the engine or select a source with EMUBRIDGE_PKG, \
                 EMUBRIDGE_BUILD_DIR or EMUBRIDGE_BIN"
                    .into(),
            ),
        })?;
        debug!(executable = %executable.display(), "Found installed engine");

        let root_dir = plan.install_root.clone();
        if !self.fs.is_dir(&root_dir) {
            return Err(HostError::NotFound {
                what: "engine install root".into(),
                path: root_dir,
                hint: Some("set EMUBRIDGE_INSTALL_ROOT (or source.install_root)".into()),
            });
        }
        let binaries_dir = root_dir.join("bin");
        Ok(Layout {
            extra_assemblies: vec![PathBuf::from(MONO_ENTRY_ASSEMBLY)],
            root_dir,
            binaries_dir,
            init: RuntimeInit::Mono,
            scratch: None,
        })
    }

    fn flavored_layout(
        &self,
        flavor: RuntimeFlavor,
        platform: &Platform,
        root_dir: PathBuf,
        binaries_dir: PathBuf,
    ) -> HostResult<Layout> {
        let (extra_assemblies, init) = match flavor {
            RuntimeFlavor::Mono => (vec![PathBuf::from(MONO_ENTRY_ASSEMBLY)], RuntimeInit::Mono),
            RuntimeFlavor::CoreClr => {
                let extras =
                    native::ensure_posix_shim(self.fs.as_ref(), platform, &binaries_dir)?;
                (extras, self.coreclr_init(&binaries_dir))
            },
        };
        Ok(Layout {
            root_dir,
            binaries_dir,
            extra_assemblies,
            init,
            scratch: None,
        })
    }

    fn coreclr_init(&self, binaries_dir: &Path) -> RuntimeInit {
        let config = binaries_dir.join(RUNTIME_CONFIG_FILE);
        if self.fs.exists(&config) {
            RuntimeInit::CoreClr {
                runtime_config: Some(config),
            }
        } else {
            warn!(
                expected = %config.display(),
                "No runtime configuration found; starting the host runtime with default settings"
            );
            RuntimeInit::CoreClr {
                runtime_config: None,
            }
        }
    }

    fn start_runtime(&self, layout: &Layout) -> HostResult<()> {
        let flavor = layout.init.flavor();
        let start = || {
            self.host.initialize(&layout.init).map_err(|e| {
                HostError::Initialization(format!("failed to start {flavor} host runtime: {e:#}"))
            })
        };

        // The self-contained runtime resolves its components relative to
        // the working directory.
        if matches!(layout.init, RuntimeInit::SelfContained { .. }) {
            in_dir(&layout.root_dir, start)?
        } else {
            start()
        }
    }
}

impl std::fmt::Debug for RuntimeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLocator")
            .field("platform", &self.platform)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

fn warn_off_thread(descriptor: &'static str) {
    warn!(
        descriptor,
        "Bootstrapping the engine off the primary thread; engine objects created later \
         may not be usable"
    );
}

fn required_location(plan: &SourcePlan) -> HostResult<PathBuf> {
    plan.location.clone().ok_or_else(|| {
        HostError::Configuration(format!("{} source selected without a path", plan.kind))
    })
}

fn absolute(path: &Path) -> HostResult<PathBuf> {
    std::path::absolute(path).map_err(|e| HostError::io(path, e))
}

/// Restores the previous working directory when dropped.
struct CwdGuard {
    previous: PathBuf,
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!(dir = %self.previous.display(), error = %e, "Failed to restore working directory");
        }
    }
}

fn in_dir<R>(dir: &Path, f: impl FnOnce() -> R) -> HostResult<R> {
    let previous = std::env::current_dir().map_err(|e| HostError::io(dir, e))?;
    std::env::set_current_dir(dir).map_err(|e| HostError::io(dir, e))?;
    let _guard = CwdGuard { previous };
    Ok(f())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::platform::{Arch, Os};

    #[derive(Default)]
    struct RecordingHost {
        inits: Mutex<Vec<RuntimeInit>>,
        loads: Mutex<Vec<PathBuf>>,
        reject: Option<&'static str>,
    }

    impl HostRuntime for RecordingHost {
        fn initialize(&self, init: &RuntimeInit) -> anyhow::Result<()> {
            self.inits.lock().unwrap().push(init.clone());
            Ok(())
        }

        fn load_assembly(&self, path: &Path) -> anyhow::Result<()> {
            if let Some(bad) = self.reject
                && path.ends_with(bad)
            {
                anyhow::bail!("BadImageFormatException");
            }
            self.loads.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    /// Counts every call that reaches the filesystem.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Counting {
        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Filesystem for Counting {
        fn exists(&self, path: &Path) -> bool {
            self.tick();
            OsFilesystem.exists(path)
        }
        fn is_dir(&self, path: &Path) -> bool {
            self.tick();
            OsFilesystem.is_dir(path)
        }
        fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
            self.tick();
            OsFilesystem.read_dir(path)
        }
        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            self.tick();
            OsFilesystem.read_to_string(path)
        }
        fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
            self.tick();
            OsFilesystem.create_dir_all(path)
        }
        fn symlink(&self, original: &Path, link: &Path) -> std::io::Result<()> {
            self.tick();
            OsFilesystem.symlink(original, link)
        }
        fn open(&self, path: &Path) -> std::io::Result<Box<dyn std::io::Read + Send>> {
            self.tick();
            OsFilesystem.open(path)
        }
    }

    const LINUX: Platform = Platform::new(Os::Linux, Arch::X64);

    fn build_tree(dlls: &[&str]) -> TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("output/bin/Release");
        fs::create_dir_all(&bin).unwrap();
        for dll in dlls {
            fs::write(bin.join(dll), b"").unwrap();
        }
        tmp
    }

    fn build_config(dir: &Path) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.source.build_dir = Some(dir.to_path_buf());
        config
    }

    fn locator(host: Arc<RecordingHost>) -> RuntimeLocator {
        RuntimeLocator::new(host)
            .with_platform(LINUX)
            .with_cleaner(Arc::new(Cleaner::new()))
    }

    #[test]
    fn mono_build_loads_directory_and_entry_assembly() {
        let tree = build_tree(&["Core.dll", "Peripherals.dll", "Renode.exe"]);
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host));

        let descriptor = locator.resolve(&build_config(tree.path())).unwrap();
        assert_eq!(descriptor.source_kind(), SourceKind::BuildDir);
        assert_eq!(descriptor.runtime_flavor(), RuntimeFlavor::Mono);
        assert_eq!(
            descriptor.binaries_dir(),
            tree.path().join("output/bin/Release")
        );

        assert_eq!(*host.inits.lock().unwrap(), vec![RuntimeInit::Mono]);
        let loaded = locator.loaded_assemblies().unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.contains("Renode.exe"));
    }

    #[test]
    fn coreclr_without_runtime_config_uses_defaults() {
        let tree = build_tree(&["Core.dll"]);
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host));
        let mut config = build_config(tree.path());
        config.runtime = Some("coreclr".into());

        locator.resolve(&config).unwrap();
        assert_eq!(
            *host.inits.lock().unwrap(),
            vec![RuntimeInit::CoreClr {
                runtime_config: None
            }]
        );
    }

    #[test]
    fn coreclr_picks_up_runtime_config() {
        let tree = build_tree(&["Core.dll"]);
        let bin = tree.path().join("output/bin/Release");
        fs::write(bin.join(RUNTIME_CONFIG_FILE), "{}").unwrap();
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host));
        let mut config = build_config(tree.path());
        config.runtime = Some("coreclr".into());

        let descriptor = locator.resolve(&config).unwrap();
        assert_eq!(
            descriptor.runtime_init(),
            &RuntimeInit::CoreClr {
                runtime_config: Some(bin.join(RUNTIME_CONFIG_FILE))
            }
        );
    }

    #[test]
    fn ambiguous_config_touches_nothing() {
        let fs = Arc::new(Counting::default());
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host)).with_filesystem(Arc::clone(&fs) as Arc<dyn Filesystem>);
        let mut config = BridgeConfig::default();
        config.source.build_dir = Some("/src/renode".into());
        config.source.package = Some("/tmp/renode.tar.gz".into());

        let err = locator.resolve(&config).unwrap_err();
        assert!(matches!(err, HostError::Configuration(_)));
        assert_eq!(fs.calls.load(Ordering::SeqCst), 0);
        assert!(host.inits.lock().unwrap().is_empty());
        assert!(!locator.is_initialized());
    }

    #[test]
    fn second_resolve_is_cached() {
        let tree = build_tree(&["Core.dll"]);
        let fs = Arc::new(Counting::default());
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host)).with_filesystem(Arc::clone(&fs) as Arc<dyn Filesystem>);

        let first = locator.resolve(&build_config(tree.path())).unwrap();
        let calls = fs.calls.load(Ordering::SeqCst);

        let mut other = BridgeConfig::default();
        other.source.binary = Some("/usr/bin/renode".into());
        let second = locator.resolve(&other).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.calls.load(Ordering::SeqCst), calls);
        assert_eq!(host.inits.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejected_assembly_is_initialization_error() {
        let tree = build_tree(&["Core.dll", "Broken.dll"]);
        let host = Arc::new(RecordingHost {
            reject: Some("Broken.dll"),
            ..Default::default()
        });
        let locator = locator(host);

        let err = locator.resolve(&build_config(tree.path())).unwrap_err();
        assert!(err.is_initialization());
        assert!(err.to_string().contains("Broken.dll"));
        assert!(!locator.is_initialized());
    }

    #[test]
    fn failed_bootstrap_never_reinitializes_the_runtime() {
        let tree = build_tree(&["Core.dll", "Broken.dll"]);
        let host = Arc::new(RecordingHost {
            reject: Some("Broken.dll"),
            ..Default::default()
        });
        let fs = Arc::new(Counting::default());
        let locator =
            locator(Arc::clone(&host)).with_filesystem(Arc::clone(&fs) as Arc<dyn Filesystem>);
        let config = build_config(tree.path());

        let first = locator.resolve(&config).unwrap_err();
        assert!(first.to_string().contains("Broken.dll"));
        let calls = fs.calls.load(Ordering::SeqCst);

        let second = locator.resolve(&config).unwrap_err();
        assert!(matches!(second, HostError::Initialization(_)));
        assert!(second.to_string().contains("already initialized"));
        assert_eq!(host.inits.lock().unwrap().len(), 1);
        assert_eq!(fs.calls.load(Ordering::SeqCst), calls);
        assert!(!locator.is_initialized());
    }

    #[test]
    fn failure_before_runtime_start_can_be_retried() {
        let tree = build_tree(&["Core.dll"]);
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host));

        locator
            .resolve(&build_config(&tree.path().join("missing")))
            .unwrap_err();
        assert!(host.inits.lock().unwrap().is_empty());

        locator.resolve(&build_config(tree.path())).unwrap();
        assert_eq!(host.inits.lock().unwrap().len(), 1);
    }

    #[test]
    fn off_thread_bootstrap_warns_and_succeeds() {
        emubridge_core::mark_primary_thread();
        let tree = build_tree(&["Core.dll"]);
        let fired = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&fired);
        let locator = Arc::new(
            locator(Arc::new(RecordingHost::default())).with_off_thread_hook(move |name| {
                seen.lock().unwrap().push(name);
            }),
        );

        let worker = Arc::clone(&locator);
        let config = build_config(tree.path());
        let descriptor = std::thread::spawn(move || worker.resolve(&config))
            .join()
            .unwrap()
            .unwrap();

        assert_eq!(descriptor.source_kind(), SourceKind::BuildDir);
        assert!(locator.is_initialized());
        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert!(fired[0].ends_with("RuntimeDescriptor"));
    }

    #[test]
    fn missing_build_dir_is_not_found() {
        let host = Arc::new(RecordingHost::default());
        let err = locator(host)
            .resolve(&build_config(Path::new("/nonexistent/renode")))
            .unwrap_err();
        assert!(matches!(err, HostError::NotFound { .. }));
        assert!(err.to_string().contains("EMUBRIDGE_BUILD_DIR"));
    }

    #[test]
    fn skip_flag_bypasses_everything() {
        let fs = Arc::new(Counting::default());
        let host = Arc::new(RecordingHost::default());
        let locator = locator(Arc::clone(&host)).with_filesystem(Arc::clone(&fs) as Arc<dyn Filesystem>);
        let mut config = build_config(Path::new("/nonexistent"));
        config.skip_bootstrap = true;

        assert!(locator.bootstrap(&config).unwrap().is_none());
        assert_eq!(fs.calls.load(Ordering::SeqCst), 0);
        assert!(!locator.is_initialized());
    }

    #[test]
    fn accessors_fail_before_bootstrap() {
        let locator = locator(Arc::new(RecordingHost::default()));
        assert!(locator.descriptor().unwrap_err().is_initialization());
        assert!(locator.loaded_assemblies().is_err());
        assert!(locator.with_root_dir(|| ()).is_err());
    }
}
