//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use scripthost_core::application::SupervisorSnapshot;
use serde::{Deserialize, Serialize};

/// script.stop.v1 - Ask the script workers to exit
#[derive(Debug, Default, Deserialize)]
pub struct StopRequest {
    /// Milliseconds to wait before giving up; omitted or null means the
    /// configured default. Integers and numeric strings are accepted,
    /// fractions are truncated, negatives are clamped to zero.
    #[serde(default)]
    pub timeout_ms: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopResult {
    NothingToStop,
    Started,
    Tightened,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    pub outcome: StopResult,
    pub active_workers: u32,
    pub ticks_remaining: i64,
}

/// script.status.v1 - Inspect the supervisor
#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub supervisor: SupervisorSnapshot,
    pub uptime_seconds: i64,
}
