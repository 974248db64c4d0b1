// Clock adapter backed by a tokio runtime
// reason: tokio timers give single-shot delays without a dedicated thread
use scripthost_core::domain::TimerId;
use scripthost_core::error::{AppError, Result};
use scripthost_core::port::{Clock, PollCallback};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{error, trace, warn};

type PendingTimers = Arc<Mutex<HashMap<TimerId, AbortHandle>>>;
type CallbackSlot = Arc<Mutex<Option<PollCallback>>>;

/// Clock implementation on top of `tokio::time::sleep`
///
/// Usable from any thread: callbacks are spawned onto the runtime behind
/// `handle`, so a real-time host thread only pays for a task spawn. Once
/// that runtime has shut down, timers fall back to a sleeping OS thread so
/// every scheduled callback is still delivered.
pub struct TokioClock {
    handle: Handle,
    next_id: AtomicU64,
    pending: PendingTimers,
}

impl TokioClock {
    /// Create a clock that schedules onto `handle`
    ///
    /// # Example
    /// ```ignore
    /// let clock = TokioClock::new(tokio::runtime::Handle::current());
    /// ```
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            next_id: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a clock for the runtime the caller is running in
    pub fn try_current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| AppError::InvalidState(format!("no tokio runtime: {}", e)))?;
        Ok(Self::new(handle))
    }

    /// Number of callbacks scheduled but not yet delivered
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl TokioClock {
    fn schedule_on_thread(&self, id: TimerId, delay: Duration, slot: CallbackSlot) {
        let pending = Arc::clone(&self.pending);
        let spawned = std::thread::Builder::new()
            .name(format!("scripthost-timer-{}", id.0))
            .spawn(move || {
                std::thread::sleep(delay);
                fire_if_pending(&pending, id, &slot);
            });
        if let Err(e) = spawned {
            lock(&self.pending).remove(&id);
            error!(timer_id = id.0, error = %e, "Timer could not be scheduled");
        }
    }
}

/// Whoever removes the entry first wins: the timer or `cancel`
fn fire_if_pending(pending: &PendingTimers, id: TimerId, slot: &CallbackSlot) {
    let still_pending = lock(pending).remove(&id).is_some();
    if !still_pending {
        return;
    }
    let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(callback) = callback {
        callback();
    }
}

fn lock(pending: &PendingTimers) -> MutexGuard<'_, HashMap<TimerId, AbortHandle>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Clock for TokioClock {
    fn schedule(&self, delay: Duration, callback: PollCallback) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let pending = Arc::clone(&self.pending);
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(callback)));

        // Insert before the task can possibly look itself up
        let mut timers = lock(&self.pending);
        let task = self.handle.spawn({
            let slot = Arc::clone(&slot);
            async move {
                tokio::time::sleep(delay).await;
                fire_if_pending(&pending, id, &slot);
            }
        });

        // The task cannot complete while we hold the map lock, so a finished
        // task here was dropped by a runtime that has shut down
        if task.is_finished() {
            warn!(
                timer_id = id.0,
                "Tokio runtime is shut down, delivering timer on a plain thread"
            );
            timers.insert(id, task.abort_handle());
            drop(timers);
            self.schedule_on_thread(id, delay, slot);
            return id;
        }
        timers.insert(id, task.abort_handle());

        trace!(timer_id = id.0, delay_ms = delay.as_millis() as u64, "Timer scheduled");
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match lock(&self.pending).remove(&id) {
            Some(task) => {
                task.abort();
                trace!(timer_id = id.0, "Timer cancelled");
                true
            }
            None => false,
        }
    }
}
