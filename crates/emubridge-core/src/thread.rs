//! Primary thread tracking.
//!
//! The host runtime must be initialized on the thread that stays the
//! process's primary thread for the lifetime of the bootstrap. Some
//! singletons wrap engine handles that are unsafe to create elsewhere.
//! The first thread to call [`mark_primary_thread`] becomes the primary
//! thread; later calls from other threads are ignored.

use std::sync::OnceLock;
use std::thread::{self, ThreadId};

static PRIMARY: OnceLock<ThreadId> = OnceLock::new();

/// Record the calling thread as the primary thread if none was recorded yet.
///
/// Returns `true` if the calling thread is (now) the primary thread.
pub fn mark_primary_thread() -> bool {
    let current = thread::current().id();
    *PRIMARY.get_or_init(|| current) == current
}

/// The recorded primary thread, if any.
#[must_use]
pub fn primary_thread() -> Option<ThreadId> {
    PRIMARY.get().copied()
}

/// Whether the calling thread is the primary thread.
///
/// Returns `true` when no primary thread has been recorded yet: nothing
/// can be off-thread before the process has chosen its primary thread.
#[must_use]
pub fn is_primary_thread() -> bool {
    PRIMARY
        .get()
        .is_none_or(|primary| *primary == thread::current().id())
}
