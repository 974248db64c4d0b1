// Panic isolation for script workers
use std::any::Any;
use std::panic::{catch_unwind, UnwindSafe};
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug, PartialEq, Eq)]
pub enum PanicGuardResult<T> {
    /// Execution completed successfully
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Execute a closure with panic isolation
///
/// If the closure panics, the panic is caught and returned as
/// `PanicGuardResult::Panicked`. A panicking script must not take the host
/// down, and it must still unwind through its worker registration.
///
/// # Example
/// ```text
/// match execute_guarded(|| panic!("bad script")) {
///     PanicGuardResult::Panicked(msg) => println!("Caught panic: {}", msg),
///     PanicGuardResult::Success(_) => {}
/// }
/// ```
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(payload) => {
            let panic_msg = panic_message(payload.as_ref());
            error!(panic_msg = %panic_msg, "Script worker panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
