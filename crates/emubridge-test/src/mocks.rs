//! Mock implementations for testing.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use emubridge_host::{
    EngineControl, Filesystem, HostRuntime, OsFilesystem, RuntimeInit, UiProvider,
};
use emubridge_proxy::{ForeignMember, ForeignObject, ForeignValue, InvokeError};
use emubridge_resource::{FileFetcher, Url};

/// Mock host runtime that records what the locator asks of it.
#[derive(Debug, Clone, Default)]
pub struct MockHostRuntime {
    /// Every initialization request, in order.
    initializations: Arc<Mutex<Vec<RuntimeInit>>>,
    /// Every loaded assembly path, in order.
    loaded: Arc<Mutex<Vec<PathBuf>>>,
    /// File name whose load is rejected.
    failing_assembly: Option<String>,
    /// Message returned from `initialize`, if it should fail.
    failing_init: Option<String>,
}

impl MockHostRuntime {
    /// Create a host runtime that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject loading the assembly with this file name.
    #[must_use]
    pub fn with_failing_assembly(mut self, file_name: impl Into<String>) -> Self {
        self.failing_assembly = Some(file_name.into());
        self
    }

    /// Fail initialization with `message`.
    #[must_use]
    pub fn with_failing_init(mut self, message: impl Into<String>) -> Self {
        self.failing_init = Some(message.into());
        self
    }

    /// Initialization requests received so far.
    #[must_use]
    pub fn initializations(&self) -> Vec<RuntimeInit> {
        self.initializations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Assembly paths loaded so far.
    #[must_use]
    pub fn loaded(&self) -> Vec<PathBuf> {
        self.loaded
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// File names of the loaded assemblies, in load order.
    #[must_use]
    pub fn loaded_names(&self) -> Vec<String> {
        self.loaded()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

impl HostRuntime for MockHostRuntime {
    fn initialize(&self, init: &RuntimeInit) -> anyhow::Result<()> {
        if let Ok(mut guard) = self.initializations.lock() {
            guard.push(init.clone());
        }
        match &self.failing_init {
            Some(message) => anyhow::bail!("{message}"),
            None => Ok(()),
        }
    }

    fn load_assembly(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(rejected) = &self.failing_assembly
            && path.file_name().is_some_and(|n| n == rejected.as_str())
        {
            anyhow::bail!("bad image format");
        }
        if let Ok(mut guard) = self.loaded.lock() {
            guard.push(path.to_path_buf());
        }
        Ok(())
    }
}

/// Real filesystem that counts every call made through it.
#[derive(Debug, Clone, Default)]
pub struct CountingFilesystem {
    calls: Arc<AtomicUsize>,
}

impl CountingFilesystem {
    /// Create a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of filesystem calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Reset the counter to zero.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Filesystem for CountingFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.tick();
        OsFilesystem.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.tick();
        OsFilesystem.is_dir(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.tick();
        OsFilesystem.read_dir(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.tick();
        OsFilesystem.read_to_string(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.tick();
        OsFilesystem.create_dir_all(path)
    }

    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        self.tick();
        OsFilesystem.symlink(original, link)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        self.tick();
        OsFilesystem.open(path)
    }
}

/// Method body of a [`MockForeignObject`].
pub type MockMethod =
    Arc<dyn Fn(&[ForeignValue]) -> Result<ForeignValue, InvokeError> + Send + Sync>;

/// Scriptable foreign object.
#[derive(Clone)]
pub struct MockForeignObject {
    type_name: String,
    bases: Vec<String>,
    values: Arc<Mutex<BTreeMap<String, ForeignValue>>>,
    read_only: Vec<String>,
    methods: BTreeMap<String, MockMethod>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockForeignObject {
    /// Create an object of runtime type `type_name` with no members.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            bases: Vec::new(),
            values: Arc::new(Mutex::new(BTreeMap::new())),
            read_only: Vec::new(),
            methods: BTreeMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a base type or interface to the type hierarchy.
    #[must_use]
    pub fn with_base(mut self, type_name: impl Into<String>) -> Self {
        self.bases.push(type_name.into());
        self
    }

    /// Add a field.
    #[must_use]
    pub fn with_value(self, name: impl Into<String>, value: impl Into<ForeignValue>) -> Self {
        if let Ok(mut guard) = self.values.lock() {
            guard.insert(name.into(), value.into());
        }
        self
    }

    /// Add a field that refuses assignment.
    #[must_use]
    pub fn with_read_only(mut self, name: impl Into<String>, value: impl Into<ForeignValue>) -> Self {
        let name = name.into();
        self.read_only.push(name.clone());
        self.with_value(name, value)
    }

    /// Add a method.
    #[must_use]
    pub fn with_method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[ForeignValue]) -> Result<ForeignValue, InvokeError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(body));
        self
    }

    /// Names of the methods invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Current value of a field.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<ForeignValue> {
        self.values
            .lock()
            .ok()
            .and_then(|guard| guard.get(name).cloned())
    }
}

impl std::fmt::Debug for MockForeignObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockForeignObject")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ForeignObject for MockForeignObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn type_hierarchy(&self) -> Vec<String> {
        std::iter::once(self.type_name.clone())
            .chain(self.bases.iter().cloned())
            .collect()
    }

    fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        if let Ok(guard) = self.values.lock() {
            names.extend(guard.keys().cloned());
        }
        names
    }

    fn member(&self, name: &str) -> Option<ForeignMember> {
        if self.methods.contains_key(name) {
            return Some(ForeignMember::Method);
        }
        self.value(name).map(ForeignMember::Value)
    }

    fn invoke(&self, name: &str, args: &[ForeignValue]) -> Result<ForeignValue, InvokeError> {
        let body = self
            .methods
            .get(name)
            .ok_or_else(|| InvokeError::Failed(format!("no method '{name}'")))?;
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(name.to_string());
        }
        body(args)
    }

    fn set_member(&self, name: &str, value: ForeignValue) -> Result<(), InvokeError> {
        if self.read_only.iter().any(|n| n == name) {
            return Err(InvokeError::Failed(format!("'{name}' is read-only")));
        }
        if self.methods.contains_key(name) {
            return Err(InvokeError::Signature(format!(
                "cannot assign to method '{name}'"
            )));
        }
        if let Ok(mut guard) = self.values.lock() {
            guard.insert(name.to_string(), value);
        }
        Ok(())
    }
}

/// File fetcher serving fixed files and counting downloads.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    files: BTreeMap<String, PathBuf>,
    fetches: Arc<AtomicUsize>,
}

impl MockFetcher {
    /// Create a fetcher that serves nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `path` for `url`.
    #[must_use]
    pub fn with_file(mut self, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(url.into(), path.into());
        self
    }

    /// Number of fetches so far, failed ones included.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FileFetcher for MockFetcher {
    fn fetch(&self, url: &Url) -> Result<PathBuf, String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| format!("404 Not Found: {url}"))
    }
}

/// Engine control that records its lifecycle calls.
///
/// `run_main_loop` blocks until `finish_main_loop` has been called.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    events: Arc<Mutex<Vec<String>>>,
    stopped: Arc<AtomicBool>,
    fail_rebuild: bool,
}

impl MockEngine {
    /// Create an engine whose calls all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `rebuild_instance`.
    #[must_use]
    pub fn with_failing_rebuild(mut self) -> Self {
        self.fail_rebuild = true;
        self
    }

    /// Lifecycle calls so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn record(&self, event: impl Into<String>) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.into());
        }
    }
}

impl EngineControl for MockEngine {
    fn rebuild_instance(&self) -> anyhow::Result<()> {
        if self.fail_rebuild {
            anyhow::bail!("engine assemblies not loaded");
        }
        self.record("rebuild");
        Ok(())
    }

    fn run_main_loop(&self) {
        self.record("loop-started");
        while !self.stopped.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
    }

    fn finish_main_loop(&self) -> anyhow::Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.record("finish");
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.record("clear");
        Ok(())
    }

    fn set_preferred_analyzers(&self, windowed: bool) -> anyhow::Result<()> {
        self.record(if windowed { "analyzers:windowed" } else { "analyzers:console" });
        Ok(())
    }
}

/// UI provider that records disposal into a shared event log.
#[derive(Debug, Clone)]
pub struct MockUi {
    events: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicBool>,
}

impl MockUi {
    /// Create a UI that writes into `engine`'s event log, so ordering
    /// across both can be checked.
    #[must_use]
    pub fn sharing_log_with(engine: &MockEngine) -> Self {
        Self {
            events: Arc::clone(&engine.events),
            active: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl UiProvider for MockUi {
    fn dispose(&self) -> anyhow::Result<()> {
        if let Ok(mut guard) = self.events.lock() {
            guard.push("dispose-ui".to_string());
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn ui_thread_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_rejects_named_assembly() {
        let host = MockHostRuntime::new().with_failing_assembly("Bad.dll");
        assert!(host.load_assembly(Path::new("/x/Good.dll")).is_ok());
        assert!(host.load_assembly(Path::new("/x/Bad.dll")).is_err());
        assert_eq!(host.loaded_names(), vec!["Good.dll"]);
    }

    #[test]
    fn filesystem_counts_calls() {
        let fs = CountingFilesystem::new();
        let _ = fs.exists(Path::new("/"));
        let _ = fs.is_dir(Path::new("/"));
        assert_eq!(fs.calls(), 2);
        fs.reset();
        assert_eq!(fs.calls(), 0);
    }

    #[test]
    fn foreign_object_members() {
        let object = MockForeignObject::new("Uart")
            .with_base("IPeripheral")
            .with_value("BaudRate", 9600_i64)
            .with_method("Reset", |_| Ok(ForeignValue::Null));

        assert_eq!(object.type_hierarchy(), vec!["Uart", "IPeripheral"]);
        assert_eq!(object.member("Reset"), Some(ForeignMember::Method));
        assert!(object.set_member("Reset", ForeignValue::Null).is_err());
        object.set_member("BaudRate", 115_200_i64.into()).unwrap();
        assert_eq!(object.value("BaudRate"), Some(ForeignValue::Int(115_200)));
    }

    #[test]
    fn fetcher_counts_failures() {
        let fetcher = MockFetcher::new();
        let url = Url::parse("https://example.com/a.elf").unwrap();
        assert!(fetcher.fetch(&url).unwrap_err().contains("404"));
        assert_eq!(fetcher.fetches(), 1);
    }
}
