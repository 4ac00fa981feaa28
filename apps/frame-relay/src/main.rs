//! Frame Relay Binary
//!
//! Starts the gRPC ingress, the WebSocket gateway and the health server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin frame-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Optional
//! - `GRPC_PORT`: gRPC ingress port (default: 50051)
//! - `RELAY_GATEWAY_PORT`: WebSocket gateway port (default: 8000)
//! - `RELAY_HEALTH_PORT`: Health check HTTP port (default: 8082)
//! - `RELAY_BIND_ADDR`: Address all listeners bind to (default: 0.0.0.0)
//! - `RELAY_SUBSCRIBER_QUEUE_CAPACITY`: Frames buffered per viewer (default: 16)
//! - `RELAY_WRITE_TIMEOUT_MS`: Per-write WebSocket timeout (default: 5000)
//! - `RELAY_PING_INTERVAL_SECS`: Server ping interval (default: 30)
//! - `RELAY_MAX_FRAME_BYTES`: Largest accepted frame, non-zero (default: 4 MiB)
//! - `RELAY_SHUTDOWN_TIMEOUT_SECS`: Graceful shutdown budget (default: 10)
//! - `GROQ_API_KEY` + `GOOGLE_TTS_API_KEY`: Enable speech translation
//! - `GROQ_BASE_URL`, `GOOGLE_TTS_BASE_URL`, `SPEECH_STATIC_DIR`, `SPEECH_TIMEOUT_SECS`
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: frame-relay)
//! - `RUST_LOG`: Log level (default: info)

use frame_relay::infrastructure::telemetry;
use frame_relay::{RelayConfig, Supervisor, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Frame Relay");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = RelayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let supervisor = Supervisor::bind(config, shutdown_token.clone()).await?;

    tokio::spawn(await_shutdown(shutdown_token));

    supervisor.run().await?;
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        bind_addr = %config.server.bind_addr,
        grpc_port = config.server.grpc_port,
        gateway_port = config.server.gateway_port,
        health_port = config.server.health_port,
        speech = config.speech_enabled(),
        "Configuration loaded"
    );
    tracing::debug!(
        queue_capacity = config.gateway.subscriber_queue_capacity,
        write_timeout_ms = u64::try_from(config.gateway.write_timeout.as_millis()).unwrap_or(u64::MAX),
        ping_interval_secs = config.gateway.ping_interval.as_secs(),
        max_frame_bytes = config.ingress.max_frame_bytes,
        "Relay limits"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => return,
    }

    shutdown_token.cancel();
}
