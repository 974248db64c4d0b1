// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Poll interval must be at least 1ms")]
    ZeroPollInterval,

    #[error("Worker counter underflow for {owner}: exit without matching start")]
    CounterUnderflow { owner: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
