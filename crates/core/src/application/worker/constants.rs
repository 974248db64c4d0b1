// Worker & supervisor constants (no magic values)
use std::time::Duration;

/// Delay between two shutdown countdown polls (20ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// Wait applied to a stop request without explicit timeout (3s)
pub const DEFAULT_STOP_WAIT_MS: u64 = 3000;

/// How often the bundled demo scripts look at their stop token (5ms)
pub const WORKER_STOP_CHECK_INTERVAL: Duration = Duration::from_millis(5);
