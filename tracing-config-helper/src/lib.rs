//! Unified logging config for the call tracker binaries.
//! It outputs logs to the console, pretty or as JSON lines,
//! and optionally exports our own spans to an OTLP collector.
//!

use opentelemetry::sdk::trace::Tracer;
use opentelemetry_otlp::WithExportConfig;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use tracing::subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown log format {other}, expected pretty or json")),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub service_name: String,
    pub log_format: LogFormat,
    /// gRPC endpoint of an OTLP collector, for example http://127.0.0.1:4317
    pub otlp_collector_url: Option<String>,
}

/// This is a guard that will flush and shutdown the OpenTelemetry exporter on drop.
/// Keep this around in main so it is dropped after the rest of the program,
/// including when unwinding from a panic.
#[derive(Debug)]
pub struct TraceShutdownGuard {
    tracer: Option<Tracer>,
}

impl Drop for TraceShutdownGuard {
    fn drop(&mut self) {
        let Some(tracer) = self.tracer.as_ref() else {
            return;
        };
        if let Some(provider) = tracer.provider() {
            for export_res in provider.force_flush() {
                if let Err(err) = export_res {
                    println!("Failed to export traces during TraceShutdownGuard drop: {:?}", err);
                }
            }
        }
        println!("Tracer is shutting down because the handle was dropped, traces will no longer be exported!");
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Uses RUST_LOG, see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
/// on how to configure that. If not present, defaults to plain "info".
/// Must be called from inside a tokio runtime when an OTLP collector is configured.
pub fn setup_tracing_or_panic(config: TracerConfig) -> TraceShutdownGuard {
    if config.service_name.trim().is_empty() {
        panic!("Service name can't be empty.");
    }
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .compact()
            .with_filter(env_filter())
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_filter(env_filter())
            .boxed(),
    };
    layers.push(console);

    let tracer = match &config.otlp_collector_url {
        None => None,
        Some(collector_url) => {
            println!(
                "Exporting traces of {} to collector at: {collector_url}",
                config.service_name
            );
            let tracer = otlp_tracer(&config.service_name, collector_url)
                .unwrap_or_else(|e| panic!("Failed to install OTLP pipeline: {e}"));
            layers.push(
                tracing_opentelemetry::layer()
                    .with_tracer(tracer.clone())
                    .with_filter(env_filter())
                    .boxed(),
            );
            Some(tracer)
        }
    };

    let subscriber = Registry::default().with(layers);
    subscriber::set_global_default(subscriber)
        .expect("Tried to initialize tracing again, please, don't do this");
    TraceShutdownGuard { tracer }
}

fn otlp_tracer(
    service_name: &str,
    collector_url: &str,
) -> Result<Tracer, opentelemetry::trace::TraceError> {
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(collector_url),
        )
        .with_trace_config(opentelemetry::sdk::trace::config().with_resource(
            opentelemetry::sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                "service.name",
                service_name.to_string(),
            )]),
        ))
        .install_batch(opentelemetry::runtime::Tokio)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        EnvFilter::builder()
            .parse(DEFAULT_FILTER)
            .unwrap_or_else(|_| panic!("{DEFAULT_FILTER} should work as filter"))
    })
}

/// Compact console logs for tests. Safe to call from every test, only the first call installs.
pub fn setup_tracing_console_logging_for_test() {
    let fmt = tracing_subscriber::fmt::layer()
        // for tests ansi if nice
        .with_ansi(true)
        .with_test_writer()
        .compact()
        .with_filter(env_filter());
    let subscriber = Registry::default().with(fmt);
    let _already_installed = subscriber::set_global_default(subscriber);
}
