// Application Layer - Shutdown supervision and worker lifecycle

pub mod supervisor;
pub mod worker;

// Re-exports
pub use supervisor::{
    ShutdownSupervisor, StopOutcome, StopToken, SupervisorSnapshot, WorkerRegistration,
};
pub use worker::{spawn_worker, WorkerExit};
