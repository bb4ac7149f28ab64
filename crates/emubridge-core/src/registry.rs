//! Process-wide singleton registry.
//!
//! Stores at most one instance per Rust type. The first construction wins;
//! later requests for the same type return the cached instance and never run
//! their factory, whatever it would have produced.
//!
//! Construction is serialized per type: the registry map lock is only held
//! long enough to find (or insert) the type's slot, then the factory runs
//! under the slot's own lock. Two threads can never both construct the same
//! type, and a factory is free to request *other* singleton types.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, warn};

use crate::thread::is_primary_thread;

type Instance = Arc<dyn Any + Send + Sync>;
type Slot = Arc<Mutex<Option<Instance>>>;

/// Callback fired when a singleton is first constructed off the primary thread.
///
/// Receives the type name of the singleton being constructed.
pub type OffThreadHook = Arc<dyn Fn(&'static str) + Send + Sync>;

/// Registry holding one instance per type.
pub struct ServiceRegistry {
    slots: Mutex<HashMap<TypeId, Slot>>,
    off_thread_hook: Mutex<OffThreadHook>,
}

impl ServiceRegistry {
    /// Create an empty registry with the default off-thread diagnostic.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            off_thread_hook: Mutex::new(Arc::new(warn_off_thread)),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ServiceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Replace the diagnostic fired on off-primary-thread construction.
    pub fn set_off_thread_hook(&self, hook: impl Fn(&'static str) + Send + Sync + 'static) {
        *self
            .off_thread_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(hook);
    }

    /// Return the instance of `T`, constructing it with `factory` on first use.
    pub fn get_or_create<T, F>(&self, factory: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        match self.get_or_try_create::<T, std::convert::Infallible, _>(|| Ok(factory())) {
            Ok(instance) => instance,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_create`](Self::get_or_create).
    ///
    /// A failing factory caches nothing; the next call runs its own factory.
    ///
    /// # Errors
    ///
    /// Returns whatever `factory` returns on failure.
    pub fn get_or_try_create<T, E, F>(&self, factory: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        let slot = self.slot::<T>();
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = guard.as_ref() {
            return Ok(downcast::<T>(existing));
        }

        if !is_primary_thread() {
            let hook = Arc::clone(
                &self
                    .off_thread_hook
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            hook(type_name::<T>());
        }

        let instance = Arc::new(factory()?);
        let erased: Instance = Arc::<T>::clone(&instance);
        *guard = Some(erased);
        debug!(singleton = type_name::<T>(), "Constructed singleton");
        Ok(instance)
    }

    /// Return the instance of `T` if it was already constructed.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(&TypeId::of::<T>()).cloned()
        }?;
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(downcast::<T>)
    }

    /// Whether an instance of `T` exists.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Number of constructed singletons.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    /// Whether no singleton has been constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached instance.
    ///
    /// Intended for test isolation. Handles already given out stay alive
    /// until their holders drop them.
    pub fn reset(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("Singleton registry reset");
    }

    fn slot<T: Any>(&self) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(TypeId::of::<T>()).or_default())
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("instances", &self.len())
            .finish_non_exhaustive()
    }
}

fn downcast<T: Any + Send + Sync>(instance: &Instance) -> Arc<T> {
    // Slots are keyed by `TypeId::of::<T>()`, so the stored value is a `T`.
    match Arc::clone(instance).downcast::<T>() {
        Ok(typed) => typed,
        Err(_) => unreachable!("singleton slot for {} holds another type", type_name::<T>()),
    }
}

fn warn_off_thread(singleton: &'static str) {
    warn!(
        singleton,
        "Singleton constructed off the primary thread; engine handles it owns may not be usable"
    );
}
