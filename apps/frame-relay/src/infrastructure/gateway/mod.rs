//! Subscriber Gateway
//!
//! HTTP server through which viewers subscribe to the live stream.
//!
//! # Endpoints
//!
//! - `GET /ws` - WebSocket upgrade; one text message per frame
//! - `GET /` - Minimal browser viewer
//!
//! The gateway only manages membership. It never looks at frame content;
//! frames reach a session through the queue registered for it.

mod registration;
mod session;
mod viewer;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use registration::RegistrationGuard;
pub use session::{SessionEnd, WriterConfig};

use crate::domain::registry::SharedRegistry;
use crate::infrastructure::broadcast::BroadcastConfig;
use crate::infrastructure::config::GatewaySettings;

// =============================================================================
// Configuration and State
// =============================================================================

/// Gateway configuration.
#[derive(Debug, Clone, Copy)]
pub struct GatewayConfig {
    /// Per-subscriber queue settings.
    pub broadcast: BroadcastConfig,
    /// Longest a single WebSocket write may take.
    pub write_timeout: Duration,
    /// Interval between server pings.
    pub ping_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&GatewaySettings::default())
    }
}

impl From<&GatewaySettings> for GatewayConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            broadcast: BroadcastConfig::from(settings),
            write_timeout: settings.write_timeout,
            ping_interval: settings.ping_interval,
        }
    }
}

/// Shared state of the gateway.
#[derive(Debug)]
pub struct GatewayState {
    registry: SharedRegistry,
    config: GatewayConfig,
    sessions: TaskTracker,
    shutdown: CancellationToken,
}

impl GatewayState {
    /// Create gateway state over a registry.
    #[must_use]
    pub fn new(registry: SharedRegistry, config: GatewayConfig, shutdown: CancellationToken) -> Self {
        Self {
            registry,
            config,
            sessions: TaskTracker::new(),
            shutdown,
        }
    }

    /// Tracker of live subscriber sessions.
    #[must_use]
    pub const fn sessions(&self) -> &TaskTracker {
        &self.sessions
    }

    /// Stop accepting sessions and wait for the live ones to end.
    ///
    /// Sessions end on their own once the shutdown token is cancelled.
    pub async fn drain_sessions(&self) {
        self.sessions.close();
        self.sessions.wait().await;
    }
}

/// Build the gateway router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(viewer::viewer_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> Response {
    if state.shutdown.is_cancelled() || state.sessions.is_closed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }

    let sessions = state.sessions.clone();
    ws.on_failed_upgrade(|e| tracing::debug!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| sessions.track_future(session::run(socket, state)))
}

// =============================================================================
// Gateway Server
// =============================================================================

/// Subscriber gateway HTTP server.
pub struct GatewayServer {
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
}

impl GatewayServer {
    /// Bind the gateway listener.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::BindFailed` if the address is unavailable.
    pub async fn bind(
        addr: SocketAddr,
        router: Router,
        cancel: CancellationToken,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::BindFailed(addr, e.to_string()))?;

        Ok(Self {
            listener,
            router,
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

    /// Serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ServerFailed` if the HTTP server fails.
    pub async fn run(self) -> Result<(), GatewayError> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(addr = %addr, "Subscriber gateway listening");
        }

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| GatewayError::ServerFailed(e.to_string()))?;

        tracing::info!("Subscriber gateway stopped");
        Ok(())
    }
}

/// Gateway server errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
