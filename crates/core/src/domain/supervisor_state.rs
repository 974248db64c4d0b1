//! Shutdown countdown state machine.
//!
//! Pure data + transitions. Locking, timers and reporting live in
//! `application::supervisor`; everything here is deterministic so the
//! policy (tighten-only deadlines, at-least-one-tick, give-up reset) can be
//! tested without threads.

use serde::Serialize;

/// Identifier of a poll callback scheduled on a `Clock`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub u64);

/// Timeout requested for a stop attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTimeout {
    /// Use the configured default wait
    Default,
    /// Explicit wait in milliseconds (negative values are clamped to 0)
    Millis(i64),
}

impl StopTimeout {
    pub fn from_optional_millis(millis: Option<i64>) -> Self {
        match millis {
            Some(ms) => Self::Millis(ms),
            None => Self::Default,
        }
    }

    /// Resolve to a non-negative wait in milliseconds
    pub fn resolve_millis(self, default_wait_ms: u64) -> u64 {
        match self {
            Self::Default => default_wait_ms,
            Self::Millis(ms) => ms.max(0) as u64,
        }
    }
}

/// Number of poll intervals a stop attempt may wait, never less than 1
pub fn requested_ticks(timeout_ms: u64, poll_interval_ms: u64) -> i64 {
    let ticks = timeout_ms / poll_interval_ms.max(1);
    i64::try_from(ticks).unwrap_or(i64::MAX).max(1)
}

/// Coarse supervisor phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Stopping,
}

/// Result of `SupervisorState::begin_stop`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    /// No workers are active, nothing changed
    NothingToStop,
    /// A new countdown was started
    Started { needs_timer: bool },
    /// A stop was already in effect; deadline is now `min(old, requested)`
    Tightened { needs_timer: bool },
}

impl StopDecision {
    pub fn needs_timer(self) -> bool {
        match self {
            Self::NothingToStop => false,
            Self::Started { needs_timer } | Self::Tightened { needs_timer } => needs_timer,
        }
    }
}

/// Result of one elapsed poll interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Every worker has exited; back to idle
    Drained,
    /// Countdown exhausted with workers still running; back to idle
    GaveUp { remaining: u32 },
    /// Workers remain and the countdown has not expired; poll again
    KeepWaiting { ticks_remaining: i64 },
    /// Poll delivered while no stop was in effect; ignored
    Stale,
}

/// Shutdown bookkeeping owned by one script object
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SupervisorState {
    active_workers: u32,
    stop_requested: bool,
    ticks_remaining: i64,
    pending_timer: Option<TimerId>,
}

impl SupervisorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_workers(&self) -> u32 {
        self.active_workers
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn ticks_remaining(&self) -> i64 {
        self.ticks_remaining
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    pub fn timer_armed(&self) -> bool {
        self.pending_timer.is_some()
    }

    pub fn phase(&self) -> Phase {
        if self.stop_requested {
            Phase::Stopping
        } else {
            Phase::Idle
        }
    }

    /// Count a worker that is about to enter its run loop
    pub fn register_start(&mut self) {
        self.active_workers = self.active_workers.saturating_add(1);
    }

    /// Count a worker that is exiting.
    ///
    /// Returns `false` if the counter was already zero (an exit without a
    /// matching start); the counter stays at zero in that case.
    pub fn register_exit(&mut self) -> bool {
        match self.active_workers.checked_sub(1) {
            Some(n) => {
                self.active_workers = n;
                true
            }
            None => false,
        }
    }

    /// Apply a stop request worth `ticks` poll intervals.
    ///
    /// Re-requesting while stopping only ever shortens the deadline.
    pub fn begin_stop(&mut self, ticks: i64) -> StopDecision {
        if self.active_workers == 0 {
            return StopDecision::NothingToStop;
        }

        let ticks = ticks.max(1);
        let already_stopping = self.stop_requested;
        if already_stopping {
            self.ticks_remaining = self.ticks_remaining.min(ticks);
        } else {
            self.ticks_remaining = ticks;
        }
        self.stop_requested = true;

        let needs_timer = !self.timer_armed();
        if already_stopping {
            StopDecision::Tightened { needs_timer }
        } else {
            StopDecision::Started { needs_timer }
        }
    }

    /// Record the timer that will deliver the next poll
    pub fn arm(&mut self, id: TimerId) {
        self.pending_timer = Some(id);
    }

    /// Forget the pending timer, returning it so the caller can cancel it
    pub fn disarm(&mut self) -> Option<TimerId> {
        self.pending_timer.take()
    }

    /// One poll interval elapsed. The firing consumes the pending timer.
    pub fn poll(&mut self) -> PollOutcome {
        self.pending_timer = None;

        if !self.stop_requested {
            return PollOutcome::Stale;
        }

        if self.active_workers == 0 {
            self.stop_requested = false;
            self.ticks_remaining = 0;
            return PollOutcome::Drained;
        }

        self.ticks_remaining -= 1;
        if self.ticks_remaining <= 0 {
            // Give-up: the remaining workers are orphaned, not tracked further
            self.stop_requested = false;
            self.ticks_remaining = 0;
            return PollOutcome::GaveUp {
                remaining: self.active_workers,
            };
        }

        PollOutcome::KeepWaiting {
            ticks_remaining: self.ticks_remaining,
        }
    }
}
