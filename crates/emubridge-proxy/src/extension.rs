//! Extension method declarations and the per-type index over them.
//!
//! Extension modules are registered explicitly at start-up. The
//! [`ExtensionCatalog`] builds one [`ExtensionMethodIndex`] per foreign type
//! the first time an object of that type is seen and reuses it afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::InvokeError;
use crate::foreign::ForeignObject;
use crate::value::{ForeignRef, ForeignValue};

/// Implementation of an extension method. Receives the extended object
/// followed by the caller's arguments.
pub type ExtensionFn =
    Arc<dyn Fn(&ForeignRef, &[ForeignValue]) -> Result<ForeignValue, InvokeError> + Send + Sync>;

/// One extension method declaration.
#[derive(Clone)]
pub struct ExtensionDeclaration {
    module: String,
    declaring_type: String,
    method: String,
    target_type: String,
    function: ExtensionFn,
}

impl ExtensionDeclaration {
    /// Declare `module.declaring_type.method` as an extension of
    /// `target_type`.
    pub fn new<F>(
        module: impl Into<String>,
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        target_type: impl Into<String>,
        function: F,
    ) -> Self
    where
        F: Fn(&ForeignRef, &[ForeignValue]) -> Result<ForeignValue, InvokeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            module: module.into(),
            declaring_type: declaring_type.into(),
            method: method.into(),
            target_type: target_type.into(),
            function: Arc::new(function),
        }
    }

    /// Declaring module (namespace).
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Declaring type.
    #[must_use]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Type the method extends.
    #[must_use]
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    /// `module.DeclaringType`, the unit conflicts are reported in.
    #[must_use]
    pub fn source(&self) -> String {
        format!("{}.{}", self.module, self.declaring_type)
    }

    /// Call the method on `target`.
    ///
    /// # Errors
    ///
    /// Whatever the implementation returns.
    pub fn invoke(
        &self,
        target: &ForeignRef,
        args: &[ForeignValue],
    ) -> Result<ForeignValue, InvokeError> {
        (self.function)(target, args)
    }
}

impl fmt::Debug for ExtensionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDeclaration")
            .field("source", &self.source())
            .field("method", &self.method)
            .field("target_type", &self.target_type)
            .finish_non_exhaustive()
    }
}

/// Every declared extension method, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    declarations: Vec<ExtensionDeclaration>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration.
    pub fn register(&mut self, declaration: ExtensionDeclaration) -> &mut Self {
        debug!(
            source = %declaration.source(),
            method = %declaration.method,
            target = %declaration.target_type,
            "Registered extension method"
        );
        self.declarations.push(declaration);
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, declaration: ExtensionDeclaration) -> Self {
        self.register(declaration);
        self
    }

    /// All declarations.
    #[must_use]
    pub fn declarations(&self) -> &[ExtensionDeclaration] {
        &self.declarations
    }

    /// Declarations extending any of `types`.
    pub fn declarations_for<'a>(
        &'a self,
        types: &'a [String],
    ) -> impl Iterator<Item = &'a ExtensionDeclaration> + 'a {
        self.declarations
            .iter()
            .filter(move |d| types.iter().any(|t| *t == d.target_type))
    }

    /// Number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Extension methods applicable to one foreign type, grouped by name.
#[derive(Debug, Clone, Default)]
pub struct ExtensionMethodIndex {
    type_name: String,
    by_name: BTreeMap<String, Vec<ExtensionDeclaration>>,
}

impl ExtensionMethodIndex {
    /// Index the declarations of `registry` that apply to `types`.
    #[must_use]
    pub fn build(registry: &ExtensionRegistry, type_name: &str, types: &[String]) -> Self {
        let mut by_name: BTreeMap<String, Vec<ExtensionDeclaration>> = BTreeMap::new();
        for declaration in registry.declarations_for(types) {
            by_name
                .entry(declaration.method.clone())
                .or_default()
                .push(declaration.clone());
        }
        Self {
            type_name: type_name.to_string(),
            by_name,
        }
    }

    /// Foreign type this index was built for.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Names of every indexed extension method.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Whether `name` is an extension method of this type.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Declarations named `name`, in registration order.
    #[must_use]
    pub fn candidates(&self, name: &str) -> &[ExtensionDeclaration] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    /// Distinct `module.Type` sources declaring `name`.
    #[must_use]
    pub fn sources(&self, name: &str) -> BTreeSet<String> {
        self.candidates(name)
            .iter()
            .map(ExtensionDeclaration::source)
            .collect()
    }
}

/// Lazily built, cached [`ExtensionMethodIndex`] per foreign type.
#[derive(Debug)]
pub struct ExtensionCatalog {
    registry: Arc<ExtensionRegistry>,
    indexes: Mutex<HashMap<String, Arc<ExtensionMethodIndex>>>,
}

impl ExtensionCatalog {
    /// Create a catalog over `registry`.
    #[must_use]
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            indexes: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Index for `object`'s runtime type, built on first use.
    pub fn index_for(&self, object: &dyn ForeignObject) -> Arc<ExtensionMethodIndex> {
        let type_name = object.type_name();
        let mut indexes = self.indexes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = indexes.get(type_name) {
            return Arc::clone(index);
        }

        let index = Arc::new(ExtensionMethodIndex::build(
            &self.registry,
            type_name,
            &object.type_hierarchy(),
        ));
        debug!(
            type_name,
            methods = index.by_name.len(),
            "Built extension method index"
        );
        indexes.insert(type_name.to_string(), Arc::clone(&index));
        index
    }

    /// Number of foreign types indexed so far.
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ExtensionCatalog {
    fn default() -> Self {
        Self::new(ExtensionRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(module: &str, ty: &str, method: &str, target: &str) -> ExtensionDeclaration {
        ExtensionDeclaration::new(module, ty, method, target, |_, _| Ok(ForeignValue::Null))
    }

    #[test]
    fn index_groups_by_name_and_source() {
        let registry = ExtensionRegistry::new()
            .with(noop("Renode.Ext", "MachineExt", "LoadELF", "Machine"))
            .with(noop("Renode.Ext", "MachineExt", "LoadELF", "Machine"))
            .with(noop("Other.Ext", "Loaders", "LoadELF", "Machine"))
            .with(noop("Renode.Ext", "UartExt", "CreateTerminal", "Uart"));

        let index = ExtensionMethodIndex::build(&registry, "Machine", &["Machine".to_string()]);
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["LoadELF"]);
        assert_eq!(index.candidates("LoadELF").len(), 3);
        assert_eq!(
            index.sources("LoadELF").into_iter().collect::<Vec<_>>(),
            vec!["Other.Ext.Loaders", "Renode.Ext.MachineExt"]
        );
        assert!(!index.contains("CreateTerminal"));
    }

    #[test]
    fn hierarchy_brings_in_base_type_extensions() {
        let registry = ExtensionRegistry::new()
            .with(noop("Ext", "PeripheralExt", "Reset", "IPeripheral"));
        let index = ExtensionMethodIndex::build(
            &registry,
            "Uart",
            &["Uart".to_string(), "IPeripheral".to_string()],
        );
        assert!(index.contains("Reset"));
    }

    #[test]
    fn empty_lookup_is_empty() {
        let index = ExtensionMethodIndex::default();
        assert!(index.candidates("missing").is_empty());
        assert!(index.sources("missing").is_empty());
    }
}
