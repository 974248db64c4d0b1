//! Telemetry setup for OpenTelemetry integration
//!
//! The OTLP export is a `tracing` layer. It is handed to `init_logging` and
//! installed in the same subscriber as the log output, so there is exactly
//! one global default.

use tracing_subscriber::{Layer, Registry};

/// Layer installed directly on the registry, below the log filter
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Outcome of telemetry setup, logged once the subscriber is installed
#[derive(Debug)]
pub enum TelemetryStatus {
    NotConfigured,
    FeatureDisabled,
    Enabled { service_name: String, endpoint: String },
    Failed(String),
}

/// Keeps the tracer provider alive; flushes pending spans on drop
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    provider: opentelemetry_sdk::trace::TracerProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        {
            let _ = self.provider.shutdown();
        }
    }
}

pub struct TelemetrySetup {
    pub layer: Option<BoxedLayer>,
    pub guard: Option<TelemetryGuard>,
    pub status: TelemetryStatus,
}

impl TelemetrySetup {
    fn without_layer(status: TelemetryStatus) -> Self {
        Self {
            layer: None,
            guard: None,
            status,
        }
    }

    /// Log the setup outcome through the installed subscriber
    pub fn report(&self) {
        match &self.status {
            TelemetryStatus::NotConfigured => {
                tracing::debug!("OpenTelemetry not configured (OTEL_EXPORTER_OTLP_ENDPOINT not set)");
            }
            TelemetryStatus::FeatureDisabled => {
                tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
                tracing::warn!("Rebuild with: cargo build --features telemetry");
            }
            TelemetryStatus::Enabled {
                service_name,
                endpoint,
            } => {
                tracing::info!(
                    service_name = %service_name,
                    endpoint = %endpoint,
                    "OpenTelemetry initialized successfully"
                );
            }
            TelemetryStatus::Failed(error) => {
                tracing::warn!(error = %error, "Failed to initialize OpenTelemetry (continuing without it)");
            }
        }
    }
}

/// Build the OpenTelemetry layer if enabled
///
/// Runs before logging is installed, so nothing is logged here; call
/// [`TelemetrySetup::report`] afterwards.
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: scripthost)
///
/// # Example
///
/// ```text
/// OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
/// OTEL_SERVICE_NAME=scripthost-dev \
///     ./scripthost-daemon
/// ```
pub fn init_telemetry() -> TelemetrySetup {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return TelemetrySetup::without_layer(TelemetryStatus::NotConfigured);
    };

    #[cfg(feature = "telemetry")]
    {
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "scripthost".to_string());
        match init_telemetry_impl(&service_name, &endpoint) {
            Ok((layer, guard)) => TelemetrySetup {
                layer: Some(layer),
                guard: Some(guard),
                status: TelemetryStatus::Enabled {
                    service_name,
                    endpoint,
                },
            },
            Err(e) => TelemetrySetup::without_layer(TelemetryStatus::Failed(format!("{e:#}"))),
        }
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = endpoint;
        TelemetrySetup::without_layer(TelemetryStatus::FeatureDisabled)
    }
}

#[cfg(feature = "telemetry")]
fn init_telemetry_impl(
    service_name: &str,
    endpoint: &str,
) -> anyhow::Result<(BoxedLayer, TelemetryGuard)> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name.to_string());

    let layer = tracing_opentelemetry::layer().with_tracer(tracer).boxed();
    Ok((layer, TelemetryGuard { provider }))
}
