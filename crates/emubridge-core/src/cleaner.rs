//! Ordered shutdown list.
//!
//! Subsystems register teardown actions with a priority while they start.
//! The owning process calls [`Cleaner::run_all`] once at its shutdown point;
//! tasks run in ascending priority order (registration order breaks ties)
//! and each runs exactly once. A failing or panicking task is recorded and
//! the remaining tasks still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, error, info};

use crate::error::{CoreError, CoreResult};

/// Well-known priorities used by the engine bootstrap.
///
/// Engine state goes first, then the user interface, then the execution
/// loop itself. Scratch directories are removed once nothing runs anymore.
pub mod priority {
    /// Clear accumulated emulation state.
    pub const CLEAR_STATE: i32 = 0;
    /// Dispose windowing and other interactive resources.
    pub const DISPOSE_UI: i32 = 3;
    /// Stop the engine's background execution loop.
    pub const STOP_EXECUTION: i32 = 10;
    /// Remove scratch directories created during bootstrap.
    pub const REMOVE_SCRATCH: i32 = 20;
}

type Action = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

struct CleanupTask {
    priority: i32,
    name: String,
    action: Action,
}

/// A cleanup task that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Priority the task was registered with.
    pub priority: i32,
    /// Task name.
    pub name: String,
    /// Error or panic message.
    pub message: String,
}

/// Outcome of a successful [`Cleaner::run_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Names of the tasks that ran, in execution order.
    pub executed: Vec<String>,
}

/// Ordered list of teardown tasks.
#[derive(Default)]
pub struct Cleaner {
    tasks: Mutex<Vec<CleanupTask>>,
}

impl Cleaner {
    /// Create an empty cleaner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cleaner.
    ///
    /// The owning process calls [`run_all`](Self::run_all) on it at its
    /// shutdown point; nothing runs it implicitly at exit.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Cleaner>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Register a teardown action. Lower priorities run first.
    pub fn register<F>(&self, priority: i32, name: impl Into<String>, action: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let name = name.into();
        debug!(priority, task = %name, "Registered cleanup task");
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CleanupTask {
                priority,
                name,
                action: Box::new(action),
            });
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run every registered task once, in ascending priority order.
    ///
    /// The list is drained before the first task runs, so tasks registered
    /// while cleaning up wait for the next call and a repeated call does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CleanupFailed`] listing every task that returned
    /// an error or panicked. All tasks have run by then.
    pub fn run_all(&self) -> CoreResult<CleanupReport> {
        let mut tasks = std::mem::take(
            &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        // Stable sort keeps registration order within a priority.
        tasks.sort_by_key(|task| task.priority);

        let mut report = CleanupReport::default();
        let mut failures = Vec::new();

        for task in tasks {
            let CleanupTask {
                priority,
                name,
                action,
            } = task;
            debug!(priority, task = %name, "Running cleanup task");

            let outcome = match catch_unwind(AssertUnwindSafe(action)) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{e:#}")),
                Err(panic) => Some(panic_message(&*panic)),
            };

            if let Some(message) = outcome {
                error!(priority, task = %name, error = %message, "Cleanup task failed");
                failures.push(CleanupFailure {
                    priority,
                    name: name.clone(),
                    message,
                });
            }
            report.executed.push(name);
        }

        if failures.is_empty() {
            info!(count = report.executed.len(), "Cleanup finished");
            Ok(report)
        } else {
            Err(CoreError::CleanupFailed { failures })
        }
    }
}

impl std::fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleaner")
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
