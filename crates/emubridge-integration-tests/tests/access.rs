//! Proxy member resolution and resource lookup against mock engine objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use emubridge_proxy::{
    ExtensionCatalog, ExtensionDeclaration, ExtensionRegistry, ForeignRef, ForeignValue,
    InvokeError, Proxy, ProxyError, SyntheticElements,
};
use emubridge_resource::{ResourceError, ResourceLocator};
use emubridge_test::{MockFetcher, MockForeignObject};

const MACHINE: &str = "Antmicro.Renode.Core.Machine";
const UART: &str = "Antmicro.Renode.Peripherals.UART.NS16550";

fn machine() -> MockForeignObject {
    MockForeignObject::new(MACHINE)
        .with_base("Antmicro.Renode.Core.IMachine")
        .with_read_only("LocalTimeSource", "virtual")
        .with_value("Name", "machine-0")
        .with_method("Pause", |args| {
            if args.is_empty() {
                Ok(ForeignValue::Null)
            } else {
                Err(InvokeError::arity(0, args.len()))
            }
        })
}

fn registry() -> ExtensionRegistry {
    ExtensionRegistry::new()
        .with(ExtensionDeclaration::new(
            "Antmicro.Renode.Peripherals",
            "MachineExtensions",
            "Pause",
            "Antmicro.Renode.Core.IMachine",
            |_, args| match args {
                [ForeignValue::Int(ms)] => Ok(ForeignValue::Str(format!("paused {ms}ms"))),
                _ => Err(InvokeError::arity(1, args.len())),
            },
        ))
        .with(ExtensionDeclaration::new(
            "Antmicro.Renode.Analyzers",
            "AnalyzerExtensions",
            "ShowAnalyzer",
            MACHINE,
            |_, _| Ok("analyzer".into()),
        ))
        .with(ExtensionDeclaration::new(
            "Antmicro.Renode.Logging",
            "LoggingExtensions",
            "ShowAnalyzer",
            "Antmicro.Renode.Core.IMachine",
            |_, _| Ok("log".into()),
        ))
}

struct Peripherals(BTreeMap<String, ForeignValue>);

impl SyntheticElements for Peripherals {
    fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<ForeignValue> {
        self.0.get(name).cloned()
    }
}

fn proxy_for(object: &MockForeignObject) -> Proxy {
    let internal: ForeignRef = Arc::new(object.clone());
    let uart: ForeignRef = Arc::new(MockForeignObject::new(UART));
    let peripherals = Peripherals(BTreeMap::from([("uart0".to_string(), uart.into())]));
    Proxy::new(internal, Arc::new(ExtensionCatalog::new(registry())))
        .with_synthetics(Arc::new(peripherals))
}

#[test]
fn own_method_and_extension_form_a_dispatcher() {
    let object = machine();
    let proxy = proxy_for(&object);

    let pause = proxy.get("Pause").unwrap().into_callable().unwrap();
    assert!(pause.is_dispatcher());

    assert_eq!(pause.call(&[]).unwrap(), ForeignValue::Null);
    assert_eq!(
        pause.call(&[ForeignValue::Int(10)]).unwrap(),
        ForeignValue::Str("paused 10ms".into())
    );
    assert_eq!(object.calls(), vec!["Pause", "Pause"]);

    let err = pause.call(&["a".into(), "b".into()]).unwrap_err();
    assert!(matches!(err, ProxyError::Dispatch { .. }));
}

#[test]
fn conflicting_extensions_name_every_source() {
    let proxy = proxy_for(&machine());

    let err = proxy.get("ShowAnalyzer").unwrap_err();
    let ProxyError::MultipleDefinitions { sources, .. } = &err else {
        panic!("expected a conflict, got {err}");
    };
    assert_eq!(
        sources,
        &vec![
            "Antmicro.Renode.Analyzers.AnalyzerExtensions".to_string(),
            "Antmicro.Renode.Logging.LoggingExtensions".to_string(),
        ]
    );

    let picked = proxy
        .call_extension("Antmicro.Renode.Logging.LoggingExtensions", "ShowAnalyzer", &[])
        .unwrap();
    assert_eq!(picked.as_str(), Some("log"));
}

#[test]
fn values_synthetics_and_locals_resolve_in_order() {
    let proxy = proxy_for(&machine());

    assert_eq!(
        proxy.get("Name").unwrap().into_value().unwrap().as_str(),
        Some("machine-0")
    );
    let uart = proxy.get("uart0").unwrap().into_value().unwrap();
    assert_eq!(uart.as_object().unwrap().type_name(), UART);

    proxy.set("note", "scratch".into()).unwrap();
    assert_eq!(
        proxy.get("note").unwrap().into_value(),
        Some(ForeignValue::Str("scratch".into()))
    );

    let members = proxy.list_members();
    for name in ["Name", "Pause", "ShowAnalyzer", "uart0", "note", "LocalTimeSource"] {
        assert!(members.contains(name), "missing {name}");
    }

    let err = proxy.get("Missing").unwrap_err();
    assert!(matches!(err, ProxyError::AttributeNotFound { .. }));
    assert!(err.to_string().contains(MACHINE));
}

#[test]
fn assignments_reach_the_foreign_object() {
    let object = machine();
    let proxy = proxy_for(&object);

    proxy.set("Name", "machine-1".into()).unwrap();
    assert_eq!(object.value("Name"), Some(ForeignValue::Str("machine-1".into())));

    let err = proxy.set("LocalTimeSource", "host".into()).unwrap_err();
    assert!(matches!(err, ProxyError::Assignment { .. }));
    assert_eq!(
        object.value("LocalTimeSource"),
        Some(ForeignValue::Str("virtual".into()))
    );
}

#[test]
fn value_members_are_not_callable() {
    let proxy = proxy_for(&machine());
    let err = proxy.call("Name", &[]).unwrap_err();
    assert!(matches!(err, ProxyError::NotCallable { .. }));
}

#[test]
fn extension_index_is_built_once_per_type() {
    let catalog = Arc::new(ExtensionCatalog::new(registry()));
    let first: ForeignRef = Arc::new(machine());
    let second: ForeignRef = Arc::new(machine());

    let a = Proxy::new(first, Arc::clone(&catalog));
    let b = Proxy::new(second, Arc::clone(&catalog));
    assert!(a.list_members().contains("Pause"));
    assert!(b.list_members().contains("Pause"));
    assert_eq!(catalog.cached_types(), 1);
}

#[test]
fn remote_resources_are_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("zephyr.elf");
    std::fs::write(&image, b"\x7fELF").unwrap();
    let fetcher = MockFetcher::new().with_file("https://dl.example.com/zephyr.elf", &image);
    let locator = ResourceLocator::new(Arc::new(fetcher.clone()));

    assert_eq!(locator.resolve("https://dl.example.com/zephyr.elf").unwrap(), image);
    assert_eq!(locator.resolve("https://dl.example.com/zephyr.elf").unwrap(), image);
    assert_eq!(fetcher.fetches(), 1);
    assert_eq!(locator.cached(), 1);

    assert_eq!(locator.resolve(image.as_path()).unwrap(), image);
}

#[test]
fn resource_failures_name_the_location() {
    let fetcher = MockFetcher::new();
    let locator = ResourceLocator::new(Arc::new(fetcher.clone()));

    let err = locator.resolve("https://dl.example.com/missing.elf").unwrap_err();
    assert!(matches!(err, ResourceError::Fetch { .. }));
    assert!(err.to_string().contains("https://dl.example.com/missing.elf"));

    locator.resolve("https://dl.example.com/missing.elf").unwrap_err();
    assert_eq!(fetcher.fetches(), 2);

    let err = locator.resolve("/nowhere/firmware.bin").unwrap_err();
    assert!(matches!(err, ResourceError::NotFound { .. }));
}
