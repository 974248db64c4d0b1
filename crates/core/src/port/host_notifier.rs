// Host Notifier Port - where give-up events are reported

use serde::Serialize;
use std::fmt;

/// A stop attempt that ran out of time with workers still running
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GiveUpReport {
    /// Name of the owning script object
    pub owner: String,
    /// Workers still registered when the countdown expired
    pub remaining: u32,
    /// Effective timeout of the abandoned attempt (ms)
    pub stop_timeout_ms: u64,
}

impl fmt::Display for GiveUpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Threads couldn't be stopped entirely - {} remaining",
            self.owner, self.remaining
        )
    }
}

/// Host reporting sink
#[cfg_attr(test, mockall::automock)]
pub trait HostNotifier: Send + Sync {
    /// Report that a stop attempt was abandoned
    fn report_give_up(&self, report: &GiveUpReport);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Notifier that keeps every report for later inspection
    #[derive(Default)]
    pub struct RecordingNotifier {
        reports: Mutex<Vec<GiveUpReport>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reports(&self) -> Vec<GiveUpReport> {
            self.reports.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.reports.lock().unwrap().len()
        }
    }

    impl HostNotifier for RecordingNotifier {
        fn report_give_up(&self, report: &GiveUpReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_message_names_owner_and_remaining() {
        let report = GiveUpReport {
            owner: "pyext".to_string(),
            remaining: 3,
            stop_timeout_ms: 60,
        };
        assert_eq!(
            report.to_string(),
            "pyext - Threads couldn't be stopped entirely - 3 remaining"
        );
    }
}
