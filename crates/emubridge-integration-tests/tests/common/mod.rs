//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use emubridge_config::BridgeConfig;
use emubridge_core::Cleaner;
use emubridge_host::{Arch, Os, Platform, RuntimeLocator};
use emubridge_test::{CountingFilesystem, MockHostRuntime};

pub const LINUX_X64: Platform = Platform::new(Os::Linux, Arch::X64);

/// A locator wired to mocks, with its own cleaner.
pub struct Harness {
    pub host: MockHostRuntime,
    pub fs: CountingFilesystem,
    pub cleaner: Arc<Cleaner>,
    pub locator: RuntimeLocator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_host(MockHostRuntime::new())
    }

    pub fn with_host(host: MockHostRuntime) -> Self {
        emubridge_test::init_test_logging();
        let fs = CountingFilesystem::new();
        let cleaner = Arc::new(Cleaner::new());
        let locator = RuntimeLocator::new(Arc::new(host.clone()))
            .with_filesystem(Arc::new(fs.clone()))
            .with_platform(LINUX_X64)
            .with_cleaner(Arc::clone(&cleaner));
        Self {
            host,
            fs,
            cleaner,
            locator,
        }
    }
}

pub fn build_dir_config(dir: &Path, runtime: Option<&str>) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.source.build_dir = Some(dir.to_path_buf());
    config.runtime = runtime.map(str::to_string);
    config
}

pub fn package_config(archive: &Path, runtime: &str) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.source.package = Some(archive.to_path_buf());
    config.runtime = Some(runtime.to_string());
    config
}
