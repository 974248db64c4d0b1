//! Demo script workers
//!
//! Stand-ins for interpreter threads so the supervisor has something to
//! stop. Real hosts spawn their own workers through `spawn_worker`.

use scripthost_core::application::worker::constants::WORKER_STOP_CHECK_INTERVAL;
use scripthost_core::application::{spawn_worker, ShutdownSupervisor, WorkerExit};
use scripthost_core::error::Result;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Start `cooperative` well-behaved scripts and `stubborn` scripts that
/// ignore the stop flag for `linger`.
pub fn spawn_demo_scripts(
    supervisor: &ShutdownSupervisor,
    cooperative: usize,
    stubborn: usize,
    linger: Duration,
) -> Result<Vec<JoinHandle<WorkerExit>>> {
    let mut handles = Vec::with_capacity(cooperative + stubborn);

    for i in 0..cooperative {
        let name = format!("script-{}", i);
        handles.push(spawn_worker(supervisor, name, move |token| {
            let mut iterations: u64 = 0;
            while !token.should_exit() {
                thread::sleep(WORKER_STOP_CHECK_INTERVAL);
                iterations += 1;
            }
            debug!(iterations, "Cooperative script observed stop");
        })?);
    }

    for i in 0..stubborn {
        let name = format!("stubborn-script-{}", i);
        handles.push(spawn_worker(supervisor, name, move |_token| {
            // Simulates a script stuck in a long native call
            let started = Instant::now();
            while started.elapsed() < linger {
                thread::sleep(WORKER_STOP_CHECK_INTERVAL);
            }
            debug!("Stubborn script finished on its own");
        })?);
    }

    Ok(handles)
}
