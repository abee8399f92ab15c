//! Tracing subscriber and optional OpenTelemetry export.
//!
//! Every crate in the workspace logs through `tracing`; this module is the
//! only place a subscriber is installed.

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;

const SERVICE_NAME: &str = "mmjira";

/// Keeps the OTLP pipeline alive until shutdown.
#[must_use = "dropping the guard without calling shutdown loses buffered spans"]
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl TelemetryGuard {
    /// Flushes and stops the span exporter, if one was installed.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Failed to shut down OpenTelemetry exporter");
            }
        }
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default filter, which is `debug` when `debug` is
/// set and `info` otherwise. Spans are exported over OTLP/gRPC when
/// `otlp_endpoint` is given. Must be called from within a tokio runtime.
pub fn init(format: LogFormat, debug: bool, otlp_endpoint: Option<&str>) -> Result<TelemetryGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let provider = match otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .context("failed to build OTLP span exporter")?;
            Some(
                TracerProvider::builder()
                    .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                    .build(),
            )
        }
        None => None,
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    let (json_layer, pretty_layer) = match format {
        LogFormat::Json => (Some(fmt::layer().json().with_current_span(true)), None),
        LogFormat::Pretty => (None, Some(fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(TelemetryGuard { provider })
}
