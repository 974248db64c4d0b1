// Worker-side handles onto a supervisor

use super::Inner;
use std::sync::Weak;

/// Registration of one running worker.
///
/// Dropping it is the worker's RegisterExit; keep it alive for the whole
/// run body so every exit path (return, `?`, panic) deregisters.
#[must_use = "dropping the registration immediately deregisters the worker"]
pub struct WorkerRegistration {
    inner: Weak<Inner>,
}

impl WorkerRegistration {
    pub(super) fn new(inner: Weak<Inner>) -> Self {
        Self { inner }
    }
}

impl Drop for WorkerRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.register_exit();
        }
    }
}

/// Cooperative stop flag as seen by a worker
#[derive(Clone)]
pub struct StopToken {
    inner: Weak<Inner>,
}

impl StopToken {
    pub(super) fn new(inner: Weak<Inner>) -> Self {
        Self { inner }
    }

    /// True while a stop attempt is in effect, or once the owning
    /// supervisor is gone.
    pub fn should_exit(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.should_exit(),
            None => true,
        }
    }
}
