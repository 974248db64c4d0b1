//! Shutdown Supervisor - bounded, non-blocking teardown of script workers
//!
//! One supervisor belongs to one script object. Workers register with it,
//! poll its stop flag, and deregister on exit. A stop request arms a
//! countdown that is polled on the host `Clock`; the attempt ends either when
//! the worker count reaches zero or when the countdown runs out, in which
//! case the remaining workers are reported to the `HostNotifier` and
//! abandoned. Nothing here ever joins or waits on a worker thread.

mod registration;

pub use registration::{StopToken, WorkerRegistration};

use crate::config::SupervisorConfig;
use crate::domain::{
    requested_ticks, Phase, PollOutcome, StopDecision, StopTimeout, SupervisorState, TimerId,
};
use crate::error::{AppError, Result};
use crate::port::{Clock, GiveUpReport, HostNotifier};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

/// What a `request_stop` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    pub decision: StopDecision,
    pub active_workers: u32,
    pub ticks_remaining: i64,
}

/// Point-in-time view of a supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorSnapshot {
    pub owner: String,
    pub phase: Phase,
    pub active_workers: u32,
    pub stop_requested: bool,
    pub ticks_remaining: i64,
    pub timer_armed: bool,
    pub poll_interval_ms: u64,
}

/// Everything guarded by the supervisor lock
struct Guarded {
    state: SupervisorState,
    /// Effective timeout of the current (or last) stop attempt
    stop_timeout_ms: u64,
}

pub(crate) struct Inner {
    owner: String,
    config: SupervisorConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn HostNotifier>,
    guarded: Mutex<Guarded>,
}

/// Handle to a shutdown supervisor (cheap to clone)
#[derive(Clone)]
pub struct ShutdownSupervisor {
    inner: Arc<Inner>,
}

impl ShutdownSupervisor {
    /// Create a supervisor for the script object named `owner`
    pub fn new(
        owner: impl Into<String>,
        config: SupervisorConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn HostNotifier>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(AppError::Validation(
                "supervisor owner name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                owner,
                config,
                clock,
                notifier,
                guarded: Mutex::new(Guarded {
                    state: SupervisorState::new(),
                    stop_timeout_ms: 0,
                }),
            }),
        })
    }

    pub fn owner(&self) -> &str {
        &self.inner.owner
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Ask all registered workers to exit within `timeout`.
    ///
    /// No-op when no worker is registered. While a stop is already running
    /// the deadline can only shrink. At most one poll is ever pending.
    pub fn request_stop(&self, timeout: StopTimeout) -> StopOutcome {
        self.inner.request_stop(timeout)
    }

    /// One poll interval elapsed. Normally invoked by the clock callback.
    pub fn on_poll_tick(&self) {
        self.inner.on_poll_tick();
    }

    /// Count a worker that is about to start running.
    ///
    /// The returned guard deregisters the worker when dropped, including
    /// when the worker body unwinds.
    pub fn register_start(&self) -> WorkerRegistration {
        self.inner.lock().state.register_start();
        WorkerRegistration::new(Arc::downgrade(&self.inner))
    }

    /// Token workers poll to learn that they should exit
    pub fn stop_token(&self) -> StopToken {
        StopToken::new(Arc::downgrade(&self.inner))
    }

    pub fn active_workers(&self) -> u32 {
        self.inner.lock().state.active_workers()
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.lock().state.stop_requested()
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        let guarded = self.inner.lock();
        SupervisorSnapshot {
            owner: self.inner.owner.clone(),
            phase: guarded.state.phase(),
            active_workers: guarded.state.active_workers(),
            stop_requested: guarded.state.stop_requested(),
            ticks_remaining: guarded.state.ticks_remaining(),
            timer_armed: guarded.state.timer_armed(),
            poll_interval_ms: self.inner.config.poll_interval_ms,
        }
    }
}

impl Inner {
    // A panic inside a critical section leaves the counters consistent
    // (every mutation is a single field write), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Guarded> {
        self.guarded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_stop(self: &Arc<Self>, timeout: StopTimeout) -> StopOutcome {
        let mut guarded = self.lock();

        let timeout_ms = timeout.resolve_millis(self.config.default_stop_wait_ms);
        let ticks = requested_ticks(timeout_ms, self.config.poll_interval_ms);
        let decision = guarded.state.begin_stop(ticks);

        match decision {
            StopDecision::NothingToStop => {
                debug!(owner = %self.owner, "Stop requested with no active workers");
            }
            StopDecision::Started { .. } => {
                guarded.stop_timeout_ms = timeout_ms;
                info!(
                    owner = %self.owner,
                    active_workers = guarded.state.active_workers(),
                    timeout_ms,
                    ticks = guarded.state.ticks_remaining(),
                    "Stopping script workers"
                );
            }
            StopDecision::Tightened { .. } => {
                guarded.stop_timeout_ms = guarded.stop_timeout_ms.min(timeout_ms);
                info!(
                    owner = %self.owner,
                    requested_ticks = ticks,
                    ticks = guarded.state.ticks_remaining(),
                    "Stop already in progress, deadline tightened"
                );
            }
        }

        if decision.needs_timer() {
            let id = self.schedule_poll();
            guarded.state.arm(id);
        }

        StopOutcome {
            decision,
            active_workers: guarded.state.active_workers(),
            ticks_remaining: guarded.state.ticks_remaining(),
        }
    }

    fn on_poll_tick(self: &Arc<Self>) {
        // Held across check, decision and reschedule so a concurrent
        // RegisterExit cannot slip in between.
        let mut guarded = self.lock();

        match guarded.state.poll() {
            PollOutcome::Drained => {
                info!(owner = %self.owner, "All script workers stopped");
            }
            PollOutcome::GaveUp { remaining } => {
                let report = GiveUpReport {
                    owner: self.owner.clone(),
                    remaining,
                    stop_timeout_ms: guarded.stop_timeout_ms,
                };
                warn!(
                    owner = %self.owner,
                    remaining,
                    timeout_ms = guarded.stop_timeout_ms,
                    "Giving up on script workers, leaving them orphaned"
                );
                self.notifier.report_give_up(&report);
            }
            PollOutcome::KeepWaiting { ticks_remaining } => {
                debug!(
                    owner = %self.owner,
                    active_workers = guarded.state.active_workers(),
                    ticks_remaining,
                    "Workers still running, polling again"
                );
                let id = self.schedule_poll();
                guarded.state.arm(id);
            }
            PollOutcome::Stale => {
                debug!(owner = %self.owner, "Ignoring poll tick outside of a stop attempt");
            }
        }
    }

    fn register_exit(&self) {
        let mut guarded = self.lock();
        if !guarded.state.register_exit() {
            let err = crate::domain::DomainError::CounterUnderflow {
                owner: self.owner.clone(),
            };
            warn!(error = %err, "Ignoring unmatched worker exit");
        }
    }

    fn should_exit(&self) -> bool {
        self.lock().state.stop_requested()
    }

    /// Schedule the next poll. The callback only holds a weak reference,
    /// so a pending poll never keeps its owner alive.
    fn schedule_poll(self: &Arc<Self>) -> TimerId {
        let weak: Weak<Inner> = Arc::downgrade(self);
        self.clock.schedule(
            self.config.poll_interval(),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_poll_tick();
                }
            }),
        )
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let guarded = self
            .guarded
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = guarded.state.disarm() {
            self.clock.cancel(id);
            debug!(owner = %self.owner, "Cancelled pending poll of dropped supervisor");
        }
    }
}
