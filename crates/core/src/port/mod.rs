// Port Layer - Interfaces for external collaborators

pub mod clock;
pub mod host_notifier;

// Re-exports
pub use clock::{Clock, PollCallback};
pub use host_notifier::{GiveUpReport, HostNotifier};
