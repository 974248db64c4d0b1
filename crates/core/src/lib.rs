// ScriptHost Core - Shutdown supervisor, domain state & ports
// NO infrastructure dependencies (hexagonal layout)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use config::SupervisorConfig;
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
