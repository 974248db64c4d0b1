//! JSON-RPC API Layer
//!
//! Exposes the script object's stop command and a status query as
//! JSON-RPC 2.0 methods.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
