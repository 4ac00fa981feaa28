//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, relay status reporting, and Prometheus metrics.
//! Used by container orchestrators, load balancers, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (all listeners serving)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::FrameIngress;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Relay version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Connected subscribers.
    pub subscribers: SubscriberStatus,
    /// Producer-side counters.
    pub ingress: IngressStatus,
    /// Fan-out counters.
    pub deliveries: DeliveryStatus,
    /// Whether the speech translation routes are mounted.
    pub speech_enabled: bool,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All listeners serving.
    Healthy,
    /// Shutting down, existing connections are draining.
    Degraded,
    /// Listeners not serving yet.
    Unhealthy,
}

/// Subscriber information.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberStatus {
    /// Registered subscribers.
    pub connected: usize,
}

/// Ingress counters.
#[derive(Debug, Clone, Serialize)]
pub struct IngressStatus {
    /// Frames accepted.
    pub frames_received: u64,
    /// Frames rejected by validation.
    pub frames_rejected: u64,
    /// Arrival time of the latest accepted frame.
    pub last_frame_at: Option<DateTime<Utc>>,
}

/// Fan-out counters.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStatus {
    /// Frames queued to subscribers.
    pub delivered: u64,
    /// Frames dropped for slow subscribers.
    pub dropped: u64,
    /// Deliveries that found the subscriber gone.
    pub failed: u64,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    ingress: Arc<FrameIngress>,
    speech_enabled: bool,
    ready: AtomicBool,
    draining: AtomicBool,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, ingress: Arc<FrameIngress>, speech_enabled: bool) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            ingress,
            speech_enabled,
            ready: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    /// Mark all listeners as serving.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Mark the relay as shutting down.
    pub fn mark_draining(&self) {
        self.draining.store(true, Ordering::Release);
    }

    fn status(&self) -> HealthStatus {
        determine_health_status(
            self.ready.load(Ordering::Acquire),
            self.draining.load(Ordering::Acquire),
        )
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    listener: TcpListener,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Bind the health listener.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError::BindFailed` if the address is unavailable.
    pub async fn bind(
        addr: SocketAddr,
        state: Arc<HealthServerState>,
        cancel: CancellationToken,
    ) -> Result<Self, HealthServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(addr, e.to_string()))?;

        Ok(Self {
            listener,
            state,
            cancel,
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the socket has no local address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if the HTTP server encounters a fatal
    /// error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(addr = %addr, "Health server listening");
        }

        axum::serve(self.listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Build the health router.
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.status() == HealthStatus::Healthy {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let stats = state.ingress.stats().snapshot();

    HealthResponse {
        status: state.status(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        subscribers: SubscriberStatus {
            connected: state.ingress.registry().len(),
        },
        ingress: IngressStatus {
            frames_received: stats.frames_received,
            frames_rejected: stats.frames_rejected,
            last_frame_at: stats.last_frame_at,
        },
        deliveries: DeliveryStatus {
            delivered: stats.deliveries,
            dropped: stats.dropped_deliveries,
            failed: stats.failed_deliveries,
        },
        speech_enabled: state.speech_enabled,
    }
}

const fn determine_health_status(ready: bool, draining: bool) -> HealthStatus {
    match (ready, draining) {
        (_, true) => HealthStatus::Degraded,
        (true, false) => HealthStatus::Healthy,
        (false, false) => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
