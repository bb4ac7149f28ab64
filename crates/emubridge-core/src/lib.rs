//! emubridge Core - Process-wide building blocks shared by every emubridge crate.
//!
//! This crate provides:
//! - [`ServiceRegistry`]: at most one instance per type for the process lifetime
//! - [`Cleaner`]: an ordered teardown list run at one explicit shutdown point
//! - Primary thread tracking used by the bootstrapper and the registry
//!
//! # Example
//!
//! ```rust
//! use emubridge_core::{Cleaner, ServiceRegistry};
//!
//! struct Counter(u32);
//!
//! let registry = ServiceRegistry::new();
//! let first = registry.get_or_create(|| Counter(1));
//! let second = registry.get_or_create(|| Counter(2));
//! assert_eq!(second.0, 1);
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//!
//! let cleaner = Cleaner::new();
//! cleaner.register(0, "noop", || Ok(()));
//! let report = cleaner.run_all().unwrap();
//! assert_eq!(report.executed, vec!["noop".to_string()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod cleaner;
pub mod error;
pub mod registry;
pub mod thread;

pub use cleaner::{CleanupFailure, CleanupReport, Cleaner, priority};
pub use error::{CoreError, CoreResult};
pub use registry::{OffThreadHook, ServiceRegistry};
pub use thread::{is_primary_thread, mark_primary_thread, primary_thread};
