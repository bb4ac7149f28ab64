//! Prelude module - commonly used types for convenient import.
//!
//! Use `use emubridge_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Singletons and shutdown
pub use crate::{Cleaner, CleanupReport, ServiceRegistry, priority};

// Threads
pub use crate::{is_primary_thread, mark_primary_thread};
