//! emubridge Test - Shared test utilities for the emubridge crates.
//!
//! This crate provides mock implementations of the seams the bootstrap
//! talks through (host runtime, filesystem, foreign objects, file fetcher,
//! engine and UI) plus on-disk fixtures for every engine source.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! emubridge-test.workspace = true
//! ```
//!
//! Then use in integration tests:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use emubridge_config::BridgeConfig;
//! use emubridge_host::RuntimeLocator;
//! use emubridge_test::{ENGINE_ASSEMBLIES, MockHostRuntime, build_tree};
//!
//! #[test]
//! fn loads_build_tree() {
//!     let tree = build_tree(ENGINE_ASSEMBLIES).unwrap();
//!     let host = MockHostRuntime::new();
//!     let locator = RuntimeLocator::new(Arc::new(host.clone()));
//!
//!     let mut config = BridgeConfig::default();
//!     config.source.build_dir = Some(tree.path().to_path_buf());
//!     locator.resolve(&config).unwrap();
//!
//!     assert!(host.loaded_names().contains(&"Core.dll".to_string()));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
