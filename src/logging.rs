use crate::app_env;
use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use opentelemetry_sdk::{Resource, runtime};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing::{Span, debug, debug_span, field, warn};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// The name of the service as it should appear in OpenTelemetry collectors
const SERVICE_NAME: &str = "project-tracker";

/// OpenTelemetry primitives which export spans and metrics to a collector
pub struct OtelExporters {
    pub tracer: Tracer,
    pub meter: SdkMeterProvider,
}

/// Wraps every route in a request span. Spans are named after the route template (e.g.
/// "/tasks/:task_id") so they group well in a collector, and continue any trace passed in
/// through W3C trace context headers.
pub fn attach_tracing_http<T>(router: Router<T>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                let route = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str().to_owned())
                    .unwrap_or_else(|| request.uri().path().to_owned());
                let req_span = debug_span!(
                    "request",
                    method = request.method().as_str(),
                    route = %route,
                    path = request.uri().path(),
                    response_status = field::Empty,
                );

                req_span.set_parent(global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                }));

                req_span
            })
            .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
                span.record("response_status", field::display(response.status()));
                debug!(latency_ms = latency.as_millis() as u64, "request processing complete");
            })
            .on_failure(|failure: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                warn!(%failure, latency_ms = latency.as_millis() as u64, "request failed");
            }),
    )
}

fn service_resource() -> Resource {
    Resource::new([KeyValue::new("service.name", SERVICE_NAME)])
}

/// Instantiates OpenTelemetry exporters which run in the background and send spans and metrics
/// to an OpenTelemetry-compatible gRPC endpoint (typically http://localhost:4317 with a collector
/// sidecar)
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()
        .with_context(|| format!("building span exporter for {otlp_traces_endpoint}"))?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()
        .with_context(|| format!("building metric exporter for {otlp_metrics_endpoint}"))?;

    let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(service_resource())
        .build()
        .tracer(SERVICE_NAME);
    let meter = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(meter_export, runtime::Tokio).build())
        .with_resource(service_resource())
        .build();

    Ok(OtelExporters { tracer, meter })
}

/// Builds the stdout log filter from the [app_env::LOG_LEVEL] directives, defaulting to "info"
pub fn init_env_filter() -> Result<EnvFilter, anyhow::Error> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(app_env::LOG_LEVEL)
        .from_env()
        .with_context(|| format!("{} contains invalid filter directives", app_env::LOG_LEVEL))
}

/// Installs the global subscriber. Logs go to stdout as JSON, filtered by `env_filter`.
/// When exporters are supplied, everything at "debug" and above is also sent to OpenTelemetry.
pub fn setup_logging_and_tracing(env_filter: EnvFilter, otel_exporters: Option<OtelExporters>) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let (span_layer, metrics_layer) = match otel_exporters {
        Some(OtelExporters { tracer, meter }) => (
            Some(OpenTelemetryLayer::new(tracer)),
            Some(MetricsLayer::new(meter)),
        ),
        None => (None, None),
    };

    registry()
        .with(LevelFilter::DEBUG)
        .with(span_layer)
        .with(metrics_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_filter(env_filter),
        )
        .init();
}
