// ScriptHost Infrastructure - System Adapters
// Implements: Clock, HostNotifier

pub mod tokio_clock;
pub mod tracing_notifier;

pub use tokio_clock::TokioClock;
pub use tracing_notifier::TracingNotifier;
