//! Core error types.

use thiserror::Error;

use crate::cleaner::CleanupFailure;

/// Errors from process-lifecycle operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// One or more cleanup tasks failed. Every other task still ran.
    #[error("{} cleanup task(s) failed: {}", .failures.len(), describe(.failures))]
    CleanupFailed {
        /// Failures in execution order.
        failures: Vec<CleanupFailure>,
    },
}

fn describe(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}: {}", f.priority, f.name, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
