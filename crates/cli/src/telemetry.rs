//! Subscriber wiring: formatted log output plus optional OTLP span export.

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::settings::TelemetryConfig;

/// Installs the global subscriber. `RUST_LOG` takes precedence over
/// `log_level`.
pub fn init(config: &TelemetryConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Invalid log level '{}'", config.log_level))?;

    // Logs go to stderr; stdout carries command output.
    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    };

    let otel_layer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let tracer = init_tracer(endpoint, &config.service_name)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .context("Failed to initialise tracing subscriber")?;

    tracing::debug!(
        log_level = %config.log_level,
        otlp_endpoint = config.otlp_endpoint.as_deref(),
        "Telemetry initialised"
    );
    Ok(())
}

/// Flushes pending spans.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

fn init_tracer(endpoint: &str, service_name: &str) -> Result<opentelemetry_sdk::trace::Tracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("Failed to build OTLP exporter for '{endpoint}'"))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource(service_name))
        .build();

    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);
    Ok(tracer)
}

/// Resource attributes attached to every exported span.
fn resource(service_name: &str) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ])
}

#[cfg(test)]
mod tests {
    use opentelemetry::Key;

    use super::*;

    #[test]
    fn test_resource_names_the_configured_service() {
        let resource = resource("devops-sync-staging");

        assert_eq!(
            resource
                .get(Key::new("service.name"))
                .map(|v| v.to_string())
                .as_deref(),
            Some("devops-sync-staging")
        );
        assert!(resource.get(Key::new("service.version")).is_some());
    }
}
