//! Engine start-up and ordered teardown.
//!
//! The engine runs its execution loop on a dedicated background thread that
//! is started once and never joined; the process stops it through the
//! [`Cleaner`] at its shutdown point:
//!
//! | priority | task |
//! |---|---|
//! | [`CLEAR_STATE`](priority::CLEAR_STATE) | clear emulation state |
//! | [`DISPOSE_UI`](priority::DISPOSE_UI) | dispose the windowing provider |
//! | [`STOP_EXECUTION`](priority::STOP_EXECUTION) | leave the execution loop |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use emubridge_core::{Cleaner, ServiceRegistry, priority};
use tracing::{debug, info, warn};

use crate::error::{HostError, HostResult};

/// Name of the engine's execution thread.
pub const ENGINE_THREAD_NAME: &str = "engine-main";

/// How often UI teardown checks whether the UI thread has exited.
pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest UI teardown waits for the UI thread.
pub const UI_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Static entry points of the foreign engine.
pub trait EngineControl: Send + Sync {
    /// Create a fresh emulation manager instance.
    ///
    /// # Errors
    ///
    /// Fatal to engine start-up.
    fn rebuild_instance(&self) -> anyhow::Result<()>;

    /// Run the execution loop. Blocks until
    /// [`finish_main_loop`](Self::finish_main_loop) is called.
    fn run_main_loop(&self);

    /// Ask the execution loop to return.
    ///
    /// # Errors
    ///
    /// Reported by the cleaner.
    fn finish_main_loop(&self) -> anyhow::Result<()>;

    /// Clear the current emulation.
    ///
    /// # Errors
    ///
    /// Reported by the cleaner.
    fn clear(&self) -> anyhow::Result<()>;

    /// Pick the analyzers used for UART and video backends: windowed ones
    /// when a UI exists, logging/dummy ones otherwise.
    ///
    /// # Errors
    ///
    /// Fatal to UI start-up.
    fn set_preferred_analyzers(&self, windowed: bool) -> anyhow::Result<()>;
}

/// A running engine.
pub struct EngineInit {
    control: Arc<dyn EngineControl>,
    running: Arc<AtomicBool>,
}

impl EngineInit {
    /// Rebuild the engine instance, start the execution thread and register
    /// the `CLEAR_STATE` and `STOP_EXECUTION` teardown tasks.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Initialization`] if the engine cannot be rebuilt
    /// or the thread cannot be spawned.
    pub fn start(control: Arc<dyn EngineControl>, cleaner: &Cleaner) -> HostResult<Self> {
        control
            .rebuild_instance()
            .map_err(|e| HostError::Initialization(format!("failed to rebuild engine: {e:#}")))?;

        let running = Arc::new(AtomicBool::new(true));
        let loop_control = Arc::clone(&control);
        let loop_running = Arc::clone(&running);
        thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Engine execution loop started");
                loop_control.run_main_loop();
                loop_running.store(false, Ordering::SeqCst);
                debug!("Engine execution loop finished");
            })
            .map_err(|e| {
                HostError::Initialization(format!("failed to spawn {ENGINE_THREAD_NAME}: {e}"))
            })?;

        let clear = Arc::clone(&control);
        cleaner.register(priority::CLEAR_STATE, "clear-emulation", move || {
            clear.clear().context("failed to clear emulation")
        });
        let finish = Arc::clone(&control);
        cleaner.register(priority::STOP_EXECUTION, "stop-execution", move || {
            finish
                .finish_main_loop()
                .context("failed to stop execution loop")
        });

        info!(thread = ENGINE_THREAD_NAME, "Engine started");
        Ok(Self { control, running })
    }

    /// The process-wide engine, started on first use with the global
    /// [`Cleaner`].
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start). A failed start is not cached.
    pub fn global(control: Arc<dyn EngineControl>) -> HostResult<Arc<Self>> {
        ServiceRegistry::global().get_or_try_create(|| Self::start(control, &Cleaner::global()))
    }

    /// Whether the execution loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Engine entry points.
    #[must_use]
    pub fn control(&self) -> &Arc<dyn EngineControl> {
        &self.control
    }
}

impl std::fmt::Debug for EngineInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInit")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// A windowing user interface provider.
pub trait UiProvider: Send + Sync {
    /// Release the provider; its UI thread exits asynchronously.
    ///
    /// # Errors
    ///
    /// Reported by the cleaner.
    fn dispose(&self) -> anyhow::Result<()>;

    /// Whether the provider's UI thread is still alive.
    fn ui_thread_active(&self) -> bool;
}

/// User interface set-up on top of a running engine.
pub struct UiInit {
    provider: Option<Arc<dyn UiProvider>>,
}

impl UiInit {
    /// Select analyzers for `provider` and register its `DISPOSE_UI`
    /// teardown.
    ///
    /// `None` means no windowing is available; logging analyzers are used
    /// and nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Initialization`] if the engine rejects the
    /// analyzer selection.
    pub fn start(
        engine: &EngineInit,
        provider: Option<Arc<dyn UiProvider>>,
        cleaner: &Cleaner,
    ) -> HostResult<Self> {
        engine
            .control()
            .set_preferred_analyzers(provider.is_some())
            .map_err(|e| {
                HostError::Initialization(format!("failed to select analyzers: {e:#}"))
            })?;

        match &provider {
            Some(ui) => {
                let ui = Arc::clone(ui);
                cleaner.register(priority::DISPOSE_UI, "dispose-ui", move || {
                    dispose_and_wait(ui.as_ref(), UI_POLL_INTERVAL, UI_SHUTDOWN_TIMEOUT)
                });
                info!("Windowed UI initialized");
            },
            None => warn!("No UI provider available; using logging analyzers"),
        }
        Ok(Self { provider })
    }

    /// Whether a windowing provider is in use.
    #[must_use]
    pub fn is_windowed(&self) -> bool {
        self.provider.is_some()
    }
}

impl std::fmt::Debug for UiInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiInit")
            .field("windowed", &self.is_windowed())
            .finish()
    }
}

fn dispose_and_wait(ui: &dyn UiProvider, poll: Duration, timeout: Duration) -> anyhow::Result<()> {
    ui.dispose().context("failed to dispose UI provider")?;
    let started = Instant::now();
    while ui.ui_thread_active() {
        if started.elapsed() >= timeout {
            anyhow::bail!("UI thread still running after {timeout:?}");
        }
        thread::sleep(poll);
    }
    Ok(())
}
