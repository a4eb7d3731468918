//! Logging and optional OTLP trace export.
//!
//! Logs are JSON lines on stdout. Spans are additionally exported over OTLP/gRPC
//! when `OTEL_EXPORTER_OTLP_ENDPOINT` is set; `OTEL_EXPORTER_OTLP_HEADERS`
//! (`k=v,k2=v2`) is sent as gRPC metadata and `OTEL_SERVICE_INSTANCE_ID`
//! overrides the generated instance id.

use anyhow::{anyhow, Result};
use opentelemetry::{
    global, propagation::TextMapCompositePropagator, trace::TracerProvider as _, KeyValue,
};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    runtime,
    trace::{Tracer, TracerProvider},
    Resource,
};
use std::{env, sync::OnceLock, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;

const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceLock<TracerProvider> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExporterSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl ExporterSettings {
    /// `None` when no endpoint is configured.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = lookup(ENDPOINT_VAR).filter(|value| !value.trim().is_empty())?;

        if let Some(protocol) = lookup("OTEL_EXPORTER_OTLP_PROTOCOL") {
            if protocol != "grpc" {
                debug!("OTEL_EXPORTER_OTLP_PROTOCOL='{protocol}' ignored, exporting over grpc");
            }
        }

        Some(Self {
            endpoint: with_scheme(endpoint.trim()),
            headers: lookup("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|raw| header_pairs(&raw))
                .unwrap_or_default(),
            instance_id: lookup("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|| Ulid::new().to_string()),
        })
    }

    fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Host to verify the collector certificate against, for `https` endpoints.
    fn tls_domain(&self) -> Option<&str> {
        self.endpoint
            .strip_prefix("https://")
            .and_then(|rest| rest.split('/').next())
            .and_then(|authority| authority.split(':').next())
            .filter(|host| !host.is_empty())
    }

    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                .map_err(|err| anyhow!("invalid OTLP header name {name}: {err}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|err| anyhow!("invalid OTLP header value for {name}: {err}"))?;
            metadata.insert(key, value);
        }
        Ok(metadata)
    }
}

fn header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn with_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn init_tracer(settings: &ExporterSettings) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.endpoint.as_str())
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = settings.tls_domain() {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }

    if !settings.headers.is_empty() {
        builder = builder.with_metadata(settings.metadata()?);
    }

    let provider = TracerProvider::builder()
        .with_batch_exporter(builder.build()?, runtime::Tokio)
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", settings.instance_id.clone()),
        ]))
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a subscriber is already installed
pub fn init(level: Option<Level>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(Level::ERROR).into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    let fmt_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(false);

    match ExporterSettings::from_env() {
        Some(settings) => {
            let tracer = init_tracer(&settings)?;
            let subscriber = Registry::default()
                .with(fmt_layer)
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

/// Flush and stop the exporter, if one was started.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            debug!("tracer provider shutdown failed: {err}");
        }
    }
}
