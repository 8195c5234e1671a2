use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, logs::SdkLoggerProvider, metrics::SdkMeterProvider, trace::SdkTracerProvider,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_FILTER: &str = "info,sqlx=warn,tower_http=debug";

struct OtlpProviders {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    logger: SdkLoggerProvider,
}

/// Flushes exporters on shutdown. Holds nothing when OTLP export is disabled.
pub struct TelemetryGuard {
    providers: Option<OtlpProviders>,
}

impl TelemetryGuard {
    pub fn shutdown(&self) {
        let Some(providers) = &self.providers else {
            return;
        };
        if let Err(e) = providers.tracer.shutdown() {
            eprintln!("Error shutting down tracer provider: {e}");
        }
        if let Err(e) = providers.meter.shutdown() {
            eprintln!("Error shutting down meter provider: {e}");
        }
        if let Err(e) = providers.logger.shutdown() {
            eprintln!("Error shutting down logger provider: {e}");
        }
    }
}

fn resource(config: &Config) -> Resource {
    Resource::builder()
        .with_service_name(config.otel_service_name.clone())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new(
            "deployment.environment",
            config.environment.clone(),
        ))
        .build()
}

fn otlp_providers(config: &Config, endpoint: &str) -> anyhow::Result<OtlpProviders> {
    let resource = resource(config);

    let spans = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()?;
    let tracer = SdkTracerProvider::builder()
        .with_batch_exporter(spans)
        .with_resource(resource.clone())
        .build();

    let metrics = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()?;
    let meter = SdkMeterProvider::builder()
        .with_periodic_exporter(metrics)
        .with_resource(resource.clone())
        .build();

    let logs = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(EXPORT_TIMEOUT)
        .build()?;
    let logger = SdkLoggerProvider::builder()
        .with_batch_exporter(logs)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(tracer.clone());
    global::set_meter_provider(meter.clone());

    Ok(OtlpProviders {
        tracer,
        meter,
        logger,
    })
}

/// Installs the global subscriber. With an OTLP endpoint, spans, metrics and log
/// records are exported over gRPC; without one, only local formatted logs are written
/// and the metric instruments fall back to the no-op global meter.
pub fn init_telemetry(config: &Config) -> anyhow::Result<TelemetryGuard> {
    let providers = config
        .otel_exporter_endpoint
        .as_deref()
        .map(|endpoint| otlp_providers(config, endpoint))
        .transpose()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = if config.is_production() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().pretty().boxed()
    };

    let otel_layers = providers.as_ref().map(|providers| {
        let tracer = global::tracer(config.otel_service_name.clone());
        OpenTelemetryLayer::new(tracer)
            .and_then(OpenTelemetryTracingBridge::new(&providers.logger))
            .boxed()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layers)
        .with(fmt_layer)
        .init();

    match &config.otel_exporter_endpoint {
        Some(endpoint) => tracing::info!(
            service = %config.otel_service_name,
            endpoint = %endpoint,
            "Telemetry initialized with OTLP trace, metric and log export"
        ),
        None => tracing::warn!(
            service = %config.otel_service_name,
            "OTEL_EXPORTER_OTLP_ENDPOINT not set, telemetry stays local"
        ),
    }

    Ok(TelemetryGuard { providers })
}
