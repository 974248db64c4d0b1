//! JSON-RPC Server
//!
//! Serves the script command surface over TCP on localhost.

use crate::handler::RpcHandler;
use crate::types::{StatusRequest, StopRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use scripthost_core::application::ShutdownSupervisor;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9537;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, supervisor: ShutdownSupervisor) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(supervisor)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Security: bind to 127.0.0.1 unless configured otherwise
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let mut module = RpcModule::new(());

        // Register methods
        let handler = self.handler.clone();
        module
            .register_async_method("script.stop.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: StopRequest = params.parse()?;
                    handler.stop(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("script.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: StatusRequest = params.parse()?;
                    handler.status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        info!("JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }
}
