//! End-to-end bootstrap through the runtime locator, one test per source.

mod common;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use common::{Harness, build_dir_config, package_config};
use emubridge_config::BridgeConfig;
use emubridge_host::{HostError, RuntimeFlavor, RuntimeInit, SourceKind};
use emubridge_test::{BUILD_OUTPUT, ENGINE_ASSEMBLIES, MockHostRuntime, PackageBuilder, build_tree};

#[test]
fn build_dir_resolves_and_loads_engine_assemblies() {
    let tree = build_tree(ENGINE_ASSEMBLIES).unwrap();
    let harness = Harness::new();

    let descriptor = harness
        .locator
        .resolve(&build_dir_config(tree.path(), None))
        .unwrap();

    assert_eq!(descriptor.source_kind(), SourceKind::BuildDir);
    assert_eq!(descriptor.runtime_flavor(), RuntimeFlavor::Mono);
    assert_eq!(descriptor.binaries_dir(), tree.path().join(BUILD_OUTPUT));

    let loaded = harness.locator.loaded_assemblies().unwrap();
    assert!(!loaded.is_empty());
    assert!(loaded.contains("Core.dll"));
    assert!(loaded.contains("Peripherals.dll"));
    assert_eq!(harness.host.initializations(), vec![RuntimeInit::Mono]);
    assert!(harness.locator.is_initialized());
}

#[test]
fn build_dir_from_environment_variables() {
    let tree = build_tree(ENGINE_ASSEMBLIES).unwrap();
    let env: HashMap<String, String> = [
        (
            "EMUBRIDGE_BUILD_DIR".to_string(),
            tree.path().display().to_string(),
        ),
        ("EMUBRIDGE_RUNTIME".to_string(), "coreclr".to_string()),
    ]
    .into_iter()
    .collect();
    let config = BridgeConfig::from_env_map(&env).unwrap();
    let harness = Harness::new();

    let descriptor = harness.locator.resolve(&config).unwrap();

    assert_eq!(descriptor.runtime_flavor(), RuntimeFlavor::CoreClr);
    assert_eq!(
        harness.host.initializations(),
        vec![RuntimeInit::CoreClr {
            runtime_config: None
        }]
    );
    assert_eq!(harness.host.loaded_names(), vec!["Core.dll", "Peripherals.dll"]);
}

#[test]
fn ambiguous_sources_fail_before_touching_the_filesystem() {
    let mut config = BridgeConfig::default();
    config.source.package = Some(PathBuf::from("/nowhere/renode.pkg.tar"));
    config.source.build_dir = Some(PathBuf::from("/nowhere/renode"));
    let harness = Harness::new();

    let err = harness.locator.resolve(&config).unwrap_err();

    assert!(matches!(err, HostError::Configuration(_)));
    assert!(err.to_string().contains("package"));
    assert!(err.to_string().contains("build_dir"));
    assert_eq!(harness.fs.calls(), 0);
    assert!(harness.host.initializations().is_empty());
    assert!(!harness.locator.is_initialized());
}

#[test]
fn second_resolve_returns_the_same_descriptor_without_io() {
    let tree = build_tree(ENGINE_ASSEMBLIES).unwrap();
    let other = build_tree(&["Other.dll"]).unwrap();
    let harness = Harness::new();

    let first = harness
        .locator
        .resolve(&build_dir_config(tree.path(), None))
        .unwrap();
    let calls = harness.fs.calls();
    let second = harness
        .locator
        .resolve(&build_dir_config(other.path(), Some("coreclr")))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(harness.fs.calls(), calls);
    assert_eq!(harness.host.initializations().len(), 1);
    assert!(!harness.locator.loaded_assemblies().unwrap().contains("Other.dll"));
}

#[test]
fn mono_package_is_extracted_and_scratch_removed_on_cleanup() {
    let out = tempfile::tempdir().unwrap();
    let archive = PackageBuilder::mono()
        .with_assemblies(ENGINE_ASSEMBLIES)
        .with_file("bin/Renode.exe", b"MZ".to_vec())
        .write_to(out.path())
        .unwrap();
    let harness = Harness::new();

    let descriptor = harness
        .locator
        .resolve(&package_config(&archive, "mono"))
        .unwrap();

    assert_eq!(descriptor.source_kind(), SourceKind::Package);
    assert!(descriptor.root_dir().ends_with("opt/renode"));
    assert_eq!(
        harness.host.loaded_names(),
        vec!["Core.dll", "Peripherals.dll", "Renode.exe"]
    );

    let scratch = descriptor.root_dir().to_path_buf();
    assert!(scratch.is_dir());
    let report = harness.cleaner.run_all().unwrap();
    assert_eq!(report.executed, vec!["remove-package-scratch"]);
    assert!(!scratch.exists());
}

#[test]
fn dotnet_package_uses_versioned_root_and_runtime_config() {
    let out = tempfile::tempdir().unwrap();
    let archive = PackageBuilder::dotnet("1.15.3")
        .with_assemblies(ENGINE_ASSEMBLIES)
        .with_file("bin/Renode.runtimeconfig.json", b"{}".to_vec())
        .uncompressed()
        .write_to(out.path())
        .unwrap();
    let harness = Harness::new();

    let descriptor = harness
        .locator
        .resolve(&package_config(&archive, "coreclr"))
        .unwrap();

    assert!(descriptor.root_dir().ends_with("renode_1.15.3"));
    let RuntimeInit::CoreClr { runtime_config } = descriptor.runtime_init() else {
        panic!("expected a .NET runtime, got {:?}", descriptor.runtime_init());
    };
    assert!(
        runtime_config
            .as_ref()
            .is_some_and(|p| p.ends_with("Renode.runtimeconfig.json"))
    );
    harness.cleaner.run_all().unwrap();
}

#[test]
fn missing_package_names_the_path() {
    let harness = Harness::new();
    let err = harness
        .locator
        .resolve(&package_config(
            &PathBuf::from("/nowhere/renode.pkg.tar.gz"),
            "mono",
        ))
        .unwrap_err();

    assert!(matches!(err, HostError::NotFound { .. }));
    assert!(err.to_string().contains("/nowhere/renode.pkg.tar.gz"));
    assert!(!harness.locator.is_initialized());
}

#[test]
fn binary_source_rejects_mono() {
    let mut config = BridgeConfig::default();
    config.source.binary = Some(PathBuf::from("/opt/renode/renode"));
    config.runtime = Some("mono".into());
    let harness = Harness::new();

    let err = harness.locator.resolve(&config).unwrap_err();

    assert!(matches!(err, HostError::UnsupportedRuntime { .. }));
    assert!(err.to_string().contains("coreclr"));
    assert_eq!(harness.fs.calls(), 0);
}

#[test]
fn failing_assembly_leaves_locator_uninitialized() {
    let tree = build_tree(ENGINE_ASSEMBLIES).unwrap();
    let harness = Harness::with_host(MockHostRuntime::new().with_failing_assembly("Peripherals.dll"));

    let err = harness
        .locator
        .resolve(&build_dir_config(tree.path(), None))
        .unwrap_err();

    assert!(err.is_initialization());
    assert!(err.to_string().contains("Peripherals.dll"));
    assert!(!harness.locator.is_initialized());
    assert!(harness.locator.descriptor().is_err());

    let again = harness
        .locator
        .resolve(&build_dir_config(tree.path(), None))
        .unwrap_err();
    assert!(matches!(again, HostError::Initialization(_)));
    assert_eq!(harness.host.initializations().len(), 1);
}

#[test]
fn build_output_override_is_used() {
    let tree = emubridge_test::build_tree_at("output/bin/Debug", ENGINE_ASSEMBLIES).unwrap();
    let mut config = build_dir_config(tree.path(), None);
    config.source.build_output = Some(PathBuf::from("output/bin/Debug"));
    let harness = Harness::new();

    let descriptor = harness.locator.resolve(&config).unwrap();

    assert_eq!(descriptor.binaries_dir(), tree.path().join("output/bin/Debug"));
}

#[test]
fn skip_flag_leaves_everything_untouched() {
    let mut config = BridgeConfig::default();
    config.skip_bootstrap = true;
    let harness = Harness::new();

    assert!(harness.locator.bootstrap(&config).unwrap().is_none());
    assert_eq!(harness.fs.calls(), 0);
    assert!(harness.host.initializations().is_empty());
}

#[cfg(unix)]
#[test]
fn single_file_binary_builds_shared_runtime() {
    let fixture = emubridge_test::single_file_binary(
        "8.0.4",
        &["System.Runtime.dll"],
        &["Renode.dll"],
    )
    .unwrap();
    let mut config = BridgeConfig::default();
    config.source.binary = Some(fixture.binary.clone());
    let harness = Harness::new();

    let descriptor = harness.locator.resolve(&config).unwrap();

    assert_eq!(descriptor.source_kind(), SourceKind::Binary);
    assert_eq!(descriptor.binaries_dir(), fixture.extracted);
    let RuntimeInit::SelfContained {
        framework_version,
        runtime_dir,
        ..
    } = descriptor.runtime_init()
    else {
        panic!("expected a self-contained runtime");
    };
    assert_eq!(framework_version, "8.0.4");
    assert!(runtime_dir.join("System.Runtime.dll").exists());
    assert!(runtime_dir.join("libcoreclr.so").exists());
    assert!(harness.locator.loaded_assemblies().unwrap().contains("Renode.dll"));
    assert!(
        harness
            .locator
            .with_root_dir(|| std::env::current_dir().unwrap())
            .unwrap()
            .ends_with("app")
    );
}

#[test]
fn unknown_runtime_flavor_names_environment_variable() {
    let tree = build_tree(ENGINE_ASSEMBLIES).unwrap();
    let harness = Harness::new();
    let err = harness
        .locator
        .resolve(&build_dir_config(tree.path(), Some("java")))
        .unwrap_err();
    assert!(err.to_string().contains("java"));
    assert!(err.to_string().contains("EMUBRIDGE_RUNTIME"));
    assert!(harness.host.initializations().is_empty());
}
