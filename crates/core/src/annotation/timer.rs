//! Cancellable one-shot timers bound to their owner's lifetime.

use std::time::Duration;

use tokio::task::AbortHandle;

/// A callback scheduled on the current `LocalSet`.
///
/// Dropping the handle cancels the callback if it has not run yet, so a
/// timer stored in a component dies with that component.
#[derive(Debug)]
pub struct Timer {
    handle: AbortHandle,
}

impl Timer {
    /// Run `callback` once after `delay`.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio::task::LocalSet`.
    pub fn after<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            callback();
        });

        Self {
            handle: task.abort_handle(),
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
