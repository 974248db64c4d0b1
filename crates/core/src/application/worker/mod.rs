// Worker - script threads tracked by a ShutdownSupervisor

pub mod constants;
mod panic_guard;

pub use panic_guard::{execute_guarded, PanicGuardResult};

use crate::application::supervisor::{ShutdownSupervisor, StopToken};
use crate::error::Result;
use std::panic::AssertUnwindSafe;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// How a worker thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The script body returned
    Finished,
    /// The script body panicked; the panic was contained
    Panicked(String),
}

/// Spawn a script worker thread tracked by `supervisor`.
///
/// The worker is registered before the OS thread exists, so a stop issued
/// right after this call already sees it. The registration travels into the
/// thread and is released on every exit path, including a failed spawn.
/// `body` receives the stop token it is expected to poll.
pub fn spawn_worker<F>(
    supervisor: &ShutdownSupervisor,
    name: impl Into<String>,
    body: F,
) -> Result<JoinHandle<WorkerExit>>
where
    F: FnOnce(StopToken) + Send + 'static,
{
    let name = name.into();
    let owner = supervisor.owner().to_string();
    let registration = supervisor.register_start();
    let token = supervisor.stop_token();
    let worker = name.clone();

    let handle = thread::Builder::new().name(name).spawn(move || {
        let _registration = registration;
        info!(owner = %owner, worker = %worker, "Script worker started");

        let exit = match execute_guarded(AssertUnwindSafe(move || body(token))) {
            PanicGuardResult::Success(()) => WorkerExit::Finished,
            PanicGuardResult::Panicked(msg) => {
                warn!(owner = %owner, worker = %worker, "Script worker ended by panic");
                WorkerExit::Panicked(msg)
            }
        };

        info!(owner = %owner, worker = %worker, "Script worker exiting");
        exit
    })?;

    Ok(handle)
}
