//! RPC Method Handlers
//!
//! Turns JSON-RPC calls into supervisor operations.

use crate::error::to_rpc_error;
use crate::types::{StatusRequest, StatusResponse, StopRequest, StopResponse, StopResult};
use jsonrpsee::types::ErrorObjectOwned;
use scripthost_core::application::ShutdownSupervisor;
use scripthost_core::domain::{StopDecision, StopTimeout};
use scripthost_core::error::AppError;
use serde_json::Value;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    supervisor: ShutdownSupervisor,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(supervisor: ShutdownSupervisor) -> Self {
        Self {
            supervisor,
            start_time: std::time::Instant::now(),
        }
    }

    /// script.stop.v1
    pub async fn stop(&self, params: StopRequest) -> Result<StopResponse, ErrorObjectOwned> {
        let timeout = parse_timeout(params.timeout_ms.as_ref()).map_err(to_rpc_error)?;

        let outcome = self.supervisor.request_stop(timeout);
        info!(
            owner = %self.supervisor.owner(),
            decision = ?outcome.decision,
            "Stop command handled"
        );

        Ok(StopResponse {
            outcome: match outcome.decision {
                StopDecision::NothingToStop => StopResult::NothingToStop,
                StopDecision::Started { .. } => StopResult::Started,
                StopDecision::Tightened { .. } => StopResult::Tightened,
            },
            active_workers: outcome.active_workers,
            ticks_remaining: outcome.ticks_remaining,
        })
    }

    /// script.status.v1
    pub async fn status(&self, _params: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        Ok(StatusResponse {
            supervisor: self.supervisor.snapshot(),
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }
}

/// Interpret the optional timeout argument of the stop command
pub fn parse_timeout(value: Option<&Value>) -> Result<StopTimeout, AppError> {
    let millis = match value {
        None | Some(Value::Null) => return Ok(StopTimeout::Default),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    millis.map(StopTimeout::Millis).ok_or_else(|| {
        AppError::Validation(format!(
            "timeout_ms must be an integer number of milliseconds, got {}",
            value.map(Value::to_string).unwrap_or_default()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripthost_core::port::clock::mocks::ManualClock;
    use scripthost_core::port::host_notifier::mocks::RecordingNotifier;
    use scripthost_core::SupervisorConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn handler() -> (RpcHandler, ShutdownSupervisor) {
        let supervisor = ShutdownSupervisor::new(
            "rpc-test",
            SupervisorConfig::default(),
            Arc::new(ManualClock::new()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();
        (RpcHandler::new(supervisor.clone()), supervisor)
    }

    #[test]
    fn test_parse_timeout_variants() {
        assert_eq!(parse_timeout(None).unwrap(), StopTimeout::Default);
        assert_eq!(
            parse_timeout(Some(&Value::Null)).unwrap(),
            StopTimeout::Default
        );
        assert_eq!(
            parse_timeout(Some(&json!(250))).unwrap(),
            StopTimeout::Millis(250)
        );
        assert_eq!(
            parse_timeout(Some(&json!(99.9))).unwrap(),
            StopTimeout::Millis(99)
        );
        assert_eq!(
            parse_timeout(Some(&json!("40"))).unwrap(),
            StopTimeout::Millis(40)
        );
        assert_eq!(
            parse_timeout(Some(&json!(-10))).unwrap(),
            StopTimeout::Millis(-10)
        );
    }

    #[test]
    fn test_parse_timeout_rejects_non_numbers() {
        let err = parse_timeout(Some(&json!("soon"))).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
        assert!(parse_timeout(Some(&json!([1, 2]))).is_err());
    }

    #[tokio::test]
    async fn test_stop_without_workers() {
        let (handler, _supervisor) = handler();

        let response = handler.stop(StopRequest::default()).await.unwrap();

        assert_eq!(response.outcome, StopResult::NothingToStop);
        assert_eq!(response.active_workers, 0);
    }

    #[tokio::test]
    async fn test_stop_then_tighten() {
        let (handler, supervisor) = handler();
        let _registration = supervisor.register_start();

        let first = handler
            .stop(StopRequest {
                timeout_ms: Some(json!(500)),
            })
            .await
            .unwrap();
        assert_eq!(first.outcome, StopResult::Started);
        assert_eq!(first.ticks_remaining, 25);

        let second = handler
            .stop(StopRequest {
                timeout_ms: Some(json!(100)),
            })
            .await
            .unwrap();
        assert_eq!(second.outcome, StopResult::Tightened);
        assert_eq!(second.ticks_remaining, 5);
    }

    #[tokio::test]
    async fn test_invalid_timeout_is_validation_error() {
        let (handler, supervisor) = handler();
        let _registration = supervisor.register_start();

        let err = handler
            .stop(StopRequest {
                timeout_ms: Some(json!({"ms": 10})),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::error::code::VALIDATION_ERROR);
        assert!(!supervisor.is_stopping());
    }

    #[tokio::test]
    async fn test_status_reports_snapshot() {
        let (handler, supervisor) = handler();
        let _registration = supervisor.register_start();

        let status = handler.status(StatusRequest::default()).await.unwrap();

        assert_eq!(status.supervisor.owner, "rpc-test");
        assert_eq!(status.supervisor.active_workers, 1);
        assert!(!status.supervisor.stop_requested);
    }
}
