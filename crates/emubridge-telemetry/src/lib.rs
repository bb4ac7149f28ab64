//! emubridge Telemetry - Logging setup for the emubridge crates.
//!
//! Every emubridge crate logs through `tracing`; this crate installs the
//! subscriber once at process start.
//!
//! # Example
//!
//! ```rust,no_run
//! use emubridge_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), emubridge_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("emubridge_host=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
