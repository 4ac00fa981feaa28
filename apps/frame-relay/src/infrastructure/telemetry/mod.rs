//! OpenTelemetry Tracing Integration
//!
//! Installs the `tracing` subscriber for the relay: an `EnvFilter`, a fmt
//! layer, and optionally an OTLP span exporter.
//!
//! # Environment Variables
//!
//! - `OTEL_ENABLED`: Set to "false" to disable span export (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: http://localhost:4318)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: frame-relay)
//! - `RUST_LOG`: Extra filter directives
//!
//! # Usage
//!
//! ```ignore
//! use frame_relay::infrastructure::telemetry;
//!
//! // Keep the guard alive until the process exits
//! let _guard = telemetry::init();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Service name for OpenTelemetry traces.
const DEFAULT_SERVICE_NAME: &str = "frame-relay";

/// Default OTLP endpoint.
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

/// Directives applied on top of `RUST_LOG`.
const STATIC_DIRECTIVES: &[&str] = &[
    "frame_relay=info",
    "push_frames=info",
    "tower_http=info",
    "h2=warn",
    "hyper=warn",
    "tungstenite=warn",
];

/// Guard that shuts down OpenTelemetry when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    #[must_use]
    pub const fn exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Whether OpenTelemetry is enabled.
    pub enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service name for traces.
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("OTEL_ENABLED").is_none_or(|v| !v.eq_ignore_ascii_case("false"));

        Self {
            enabled,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        }
    }
}

/// Initialize telemetry with default configuration from environment.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, OpenTelemetry will be properly shut down.
#[must_use]
pub fn init() -> TelemetryGuard {
    init_with_config(TelemetryConfig::from_env())
}

/// Initialize telemetry with custom configuration.
///
/// If the OTLP exporter cannot be built the subscriber is installed without
/// it and a warning is logged.
#[must_use]
pub fn init_with_config(config: TelemetryConfig) -> TelemetryGuard {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let exporter = if config.enabled {
        Some(
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(&config.otlp_endpoint)
                .build(),
        )
    } else {
        None
    };

    match exporter {
        Some(Ok(otlp_exporter)) => {
            let tracer_provider = SdkTracerProvider::builder()
                .with_batch_exporter(otlp_exporter)
                .with_resource(
                    opentelemetry_sdk::Resource::builder()
                        .with_service_name(config.service_name.clone())
                        .build(),
                )
                .build();

            let tracer = tracer_provider.tracer(config.service_name);
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt_layer)
                .with(otel_layer)
                .init();

            TelemetryGuard {
                tracer_provider: Some(tracer_provider),
            }
        }
        Some(Err(e)) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt_layer)
                .init();
            tracing::warn!(error = %e, endpoint = %config.otlp_endpoint, "OTLP exporter unavailable, exporting disabled");

            TelemetryGuard {
                tracer_provider: None,
            }
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt_layer)
                .init();

            TelemetryGuard {
                tracer_provider: None,
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    STATIC_DIRECTIVES
        .iter()
        .filter_map(|directive| directive.parse().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::Directive;

    use super::*;

    #[test]
    fn default_config() {
        let config = TelemetryConfig::default();
        assert!(config.enabled);
        assert_eq!(config.otlp_endpoint, DEFAULT_OTLP_ENDPOINT);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn otel_can_be_disabled() {
        let config = TelemetryConfig::from_lookup(|key| {
            (key == "OTEL_ENABLED").then(|| "FALSE".to_string())
        });
        assert!(!config.enabled);
        assert_eq!(config.service_name, "frame-relay");
    }

    #[test]
    fn endpoint_and_service_name_overrides() {
        let config = TelemetryConfig::from_lookup(|key| match key {
            "OTEL_EXPORTER_OTLP_ENDPOINT" => Some("http://collector:4318".to_string()),
            "OTEL_SERVICE_NAME" => Some("relay-edge".to_string()),
            _ => None,
        });
        assert!(config.enabled);
        assert_eq!(config.otlp_endpoint, "http://collector:4318");
        assert_eq!(config.service_name, "relay-edge");
    }

    #[test]
    fn static_directives_parse() {
        for directive in STATIC_DIRECTIVES {
            assert!(directive.parse::<Directive>().is_ok(), "{directive}");
        }
    }
}
