//! ScriptHost Daemon - Main Entry Point
//! Runs script workers under a ShutdownSupervisor and serves the stop command

mod scripts;
mod settings;
mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Import workspace crates
use scripthost_api_rpc::{RpcServer, RpcServerConfig};
use scripthost_core::application::ShutdownSupervisor;
use scripthost_core::domain::StopTimeout;
use scripthost_infra_system::{TokioClock, TracingNotifier};
use settings::DaemonSettings;
use telemetry::BoxedLayer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging, with the OpenTelemetry layer when configured
    let mut otel = telemetry::init_telemetry();
    let _log_guard = init_logging(otel.layer.take())?;
    let _telemetry_guard = otel.guard.take();

    info!("ScriptHost daemon v{} starting...", VERSION);
    otel.report();

    // 2. Load configuration
    let settings = DaemonSettings::load()?;
    info!(
        owner = %settings.owner_name,
        poll_interval_ms = settings.supervisor.poll_interval_ms,
        default_stop_wait_ms = settings.supervisor.default_stop_wait_ms,
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let clock = Arc::new(TokioClock::try_current()?);
    let notifier = Arc::new(TracingNotifier::new());
    let supervisor = ShutdownSupervisor::new(
        settings.owner_name.clone(),
        settings.supervisor.clone(),
        clock,
        notifier,
    )?;

    // 4. Start script workers
    let workers = scripts::spawn_demo_scripts(
        &supervisor,
        settings.demo_workers,
        settings.demo_stubborn_workers,
        Duration::from_millis(settings.stubborn_linger_ms),
    )?;
    info!(workers = workers.len(), "Script workers started");

    // 5. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: settings.rpc_host.clone(),
        port: settings.rpc_port,
    };
    let rpc_handle = RpcServer::new(rpc_config, supervisor.clone())
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!("System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping script workers...");

    // 7. Bounded shutdown: the supervisor decides when to give up
    supervisor.request_stop(StopTimeout::Default);
    let budget = Duration::from_millis(
        settings.supervisor.default_stop_wait_ms + 2 * settings.supervisor.poll_interval_ms,
    );
    let drained = tokio::time::timeout(budget, async {
        while supervisor.is_stopping() {
            tokio::time::sleep(settings.supervisor.poll_interval()).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!("Supervisor still stopping after its budget, exiting anyway");
    }

    let orphaned = supervisor.active_workers();
    if orphaned > 0 {
        warn!(orphaned, "Leaving orphaned script workers behind");
    }
    // Worker threads are detached, never joined
    drop(workers);

    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;

    info!("Shutdown complete.");

    Ok(())
}

/// Pretty or JSON output on stdout, plus an optional daily log file
/// when `SCRIPTHOST_LOG_DIR` is set.
fn init_logging(
    telemetry_layer: Option<BoxedLayer>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let log_format =
        std::env::var("SCRIPTHOST_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("scripthost=info"))?;

    let (file_writer, guard) = match std::env::var("SCRIPTHOST_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "scripthost.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        Err(_) => (None, None),
    };

    build_subscriber(&log_format, env_filter, file_writer, telemetry_layer).init();

    Ok(guard)
}

/// Single subscriber stack: telemetry, filter, file, stdout
fn build_subscriber(
    log_format: &str,
    env_filter: EnvFilter,
    file_writer: Option<tracing_appender::non_blocking::NonBlocking>,
    telemetry_layer: Option<BoxedLayer>,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    let file_layer = file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false));

    let stdout_layer = match log_format {
        // Production: JSON structured logging
        "json" => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        _ => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
}
