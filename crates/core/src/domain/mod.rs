// Domain Layer - Pure shutdown state machine

pub mod error;
pub mod supervisor_state;

// Re-exports
pub use error::DomainError;
pub use supervisor_state::{
    requested_ticks, Phase, PollOutcome, StopDecision, StopTimeout, SupervisorState, TimerId,
};
