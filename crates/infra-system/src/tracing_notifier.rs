// HostNotifier adapter that posts give-up events to the log
use scripthost_core::port::{GiveUpReport, HostNotifier};
use tracing::warn;

/// Reports give-ups as `tracing` warnings on the `scripthost::host` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl HostNotifier for TracingNotifier {
    fn report_give_up(&self, report: &GiveUpReport) {
        warn!(
            target: "scripthost::host",
            owner = %report.owner,
            remaining = report.remaining,
            timeout_ms = report.stop_timeout_ms,
            "{}",
            report
        );
    }
}
