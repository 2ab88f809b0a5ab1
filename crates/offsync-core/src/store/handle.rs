use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Completion {
    completed: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

/// Handle to an asynchronous store write.
///
/// The owning loop polls [`WriteHandle::is_completed`]; blocking callers can
/// use [`WriteHandle::wait`] instead.
#[derive(Debug, Clone)]
pub struct WriteHandle {
    state: Arc<Completion>,
}

/// Producer side of a [`WriteHandle`].
///
/// Completes the handle when `complete` is called or when dropped, so a
/// writer that goes away never leaves a handle pending forever.
#[derive(Debug)]
pub struct WriteCompleter {
    state: Arc<Completion>,
}

impl WriteHandle {
    /// Create a pending handle and its completer.
    pub fn pending() -> (WriteHandle, WriteCompleter) {
        let state = Arc::new(Completion::default());
        (
            WriteHandle {
                state: Arc::clone(&state),
            },
            WriteCompleter { state },
        )
    }

    /// Create a handle that is already completed.
    pub fn completed() -> WriteHandle {
        let (handle, completer) = Self::pending();
        completer.complete();
        handle
    }

    pub fn is_completed(&self) -> bool {
        self.state.completed.load(Ordering::SeqCst)
    }

    /// Wait for the write to complete, up to `timeout`.
    ///
    /// Returns `true` if the write completed.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_completed() {
            return true;
        }

        let guard = self
            .state
            .mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (_guard, result) = self
            .state
            .condvar
            .wait_timeout_while(guard, timeout, |_| !self.is_completed())
            .unwrap_or_else(PoisonError::into_inner);

        !result.timed_out() || self.is_completed()
    }
}

impl WriteCompleter {
    pub fn complete(self) {}
}

impl Drop for WriteCompleter {
    fn drop(&mut self) {
        let _guard = self
            .state
            .mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.state.completed.store(true, Ordering::SeqCst);
        self.state.condvar.notify_all();
    }
}
