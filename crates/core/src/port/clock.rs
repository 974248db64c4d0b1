// Clock Port - single-shot timer driven by the host's timing context

use crate::domain::TimerId;
use std::time::Duration;

/// Callback delivered once when a scheduled delay elapses
pub type PollCallback = Box<dyn FnOnce() + Send + 'static>;

/// Clock service interface
///
/// Every `schedule` call produces exactly one callback invocation unless the
/// timer is cancelled first. Implementations must not invoke the callback
/// synchronously from inside `schedule`: callers schedule while holding
/// their own lock.
pub trait Clock: Send + Sync {
    /// Run `callback` once after `delay`
    fn schedule(&self, delay: Duration, callback: PollCallback) -> TimerId;

    /// Drop a pending callback. Returns false if it already fired or was unknown.
    fn cancel(&self, id: TimerId) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ManualClockState {
        next_id: u64,
        pending: BTreeMap<TimerId, (Duration, PollCallback)>,
        scheduled_total: usize,
        last_delay: Option<Duration>,
    }

    /// Clock that only fires when the test says so
    #[derive(Default)]
    pub struct ManualClock {
        state: Mutex<ManualClockState>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of callbacks waiting to fire
        pub fn pending(&self) -> usize {
            self.state.lock().unwrap().pending.len()
        }

        /// Number of `schedule` calls seen so far
        pub fn scheduled_total(&self) -> usize {
            self.state.lock().unwrap().scheduled_total
        }

        pub fn last_delay(&self) -> Option<Duration> {
            self.state.lock().unwrap().last_delay
        }

        /// Fire the oldest pending callback. Returns false if none was pending.
        pub fn fire_next(&self) -> bool {
            // Release the lock before running: the callback may reschedule
            let next = self.state.lock().unwrap().pending.pop_first();
            match next {
                Some((_, (_, callback))) => {
                    callback();
                    true
                }
                None => false,
            }
        }
    }

    impl Clock for ManualClock {
        fn schedule(&self, delay: Duration, callback: PollCallback) -> TimerId {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = TimerId(state.next_id);
            state.pending.insert(id, (delay, callback));
            state.scheduled_total += 1;
            state.last_delay = Some(delay);
            id
        }

        fn cancel(&self, id: TimerId) -> bool {
            self.state.lock().unwrap().pending.remove(&id).is_some()
        }
    }
}
