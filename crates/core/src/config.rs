// Supervisor configuration

use crate::application::worker::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_STOP_WAIT_MS};
use crate::domain::DomainError;
use serde::Deserialize;
use std::time::Duration;

/// Timing knobs for a `ShutdownSupervisor`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Delay between two countdown polls (ms)
    pub poll_interval_ms: u64,

    /// Wait used when a stop request carries no timeout (ms)
    pub default_stop_wait_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_stop_wait_ms: DEFAULT_STOP_WAIT_MS,
        }
    }
}

impl SupervisorConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.poll_interval_ms == 0 {
            return Err(DomainError::ZeroPollInterval);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.poll_interval_ms, 20);
        assert_eq!(config.default_stop_wait_ms, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = SupervisorConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(DomainError::ZeroPollInterval));
    }
}
