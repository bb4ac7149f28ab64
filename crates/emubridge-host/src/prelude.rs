//! Convenient re-exports for bootstrapping the engine.
//!
//! ```rust
//! use emubridge_host::prelude::*;
//! ```

pub use crate::{
    EngineControl, EngineInit, Filesystem, HostError, HostResult, HostRuntime,
    LoadedAssemblySet, OsFilesystem, RuntimeDescriptor, RuntimeFlavor, RuntimeInit,
    RuntimeLocator, SourceKind, UiInit, UiProvider,
};
