//! Process Supervisor
//!
//! Builds the shared registry and every service once, binds all listeners up
//! front and runs the servers concurrently:
//!
//! ```text
//!   producers ──gRPC──► FrameRelayServer ─┐
//!                                          ├─► SubscriberRegistry ──► sessions ──► viewers
//!   viewers ──/ws──► GatewayServer ───────┘
//!   probes ──► HealthServer
//! ```
//!
//! Shutdown starts when the cancellation token fires or any server exits.
//! All listeners stop accepting, subscriber sessions are closed, and the
//! supervisor waits for in-flight work up to the configured timeout.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::application::services::FrameIngress;
use crate::domain::frame::FrameLimits;
use crate::domain::registry::{SharedRegistry, SubscriberRegistry};
use crate::infrastructure::config::RelayConfig;
use crate::infrastructure::gateway::{self, GatewayConfig, GatewayError, GatewayServer, GatewayState};
use crate::infrastructure::grpc::{FrameRelayServer, FrameRelayServerConfig};
use crate::infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
use crate::infrastructure::speech::{self, SpeechSetupError};

/// Supervisor errors.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// A listener could not be bound.
    #[error("failed to bind {listener} listener on {addr}: {message}")]
    Bind {
        /// Which listener.
        listener: &'static str,
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        message: String,
    },

    /// The speech pipeline could not be set up.
    #[error(transparent)]
    Speech(#[from] SpeechSetupError),

    /// A server exited with an error, or exited before shutdown was requested.
    #[error("{server} server failed: {message}")]
    Server {
        /// Which server.
        server: &'static str,
        /// What happened.
        message: String,
    },
}

/// Addresses the listeners are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    /// gRPC ingress.
    pub grpc: SocketAddr,
    /// WebSocket gateway (and speech routes).
    pub gateway: SocketAddr,
    /// Health and metrics.
    pub health: SocketAddr,
}

/// Owns the relay's listeners and shared state.
pub struct Supervisor {
    config: RelayConfig,
    registry: SharedRegistry,
    ingress: Arc<FrameIngress>,
    gateway_state: Arc<GatewayState>,
    health_state: Arc<HealthServerState>,
    grpc_listener: TcpListener,
    gateway: GatewayServer,
    health: HealthServer,
    addrs: BoundAddrs,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("addrs", &self.addrs)
            .field("subscribers", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Build every service and bind all listeners.
    ///
    /// Nothing is served until [`Supervisor::run`].
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Bind` if any listener cannot be bound and
    /// `SupervisorError::Speech` if speech is configured but cannot be set up.
    pub async fn bind(config: RelayConfig, cancel: CancellationToken) -> Result<Self, SupervisorError> {
        let version = env!("CARGO_PKG_VERSION").to_string();

        let registry: SharedRegistry = Arc::new(SubscriberRegistry::new());
        let ingress = Arc::new(FrameIngress::new(
            Arc::clone(&registry),
            FrameLimits::from(&config.ingress),
        ));

        let gateway_state = Arc::new(GatewayState::new(
            Arc::clone(&registry),
            GatewayConfig::from(&config.gateway),
            cancel.clone(),
        ));
        let mut router = gateway::router(Arc::clone(&gateway_state));
        if let Some(settings) = &config.speech {
            let pipeline = speech::build_pipeline(settings).await?;
            router = router.merge(speech::router(Arc::new(pipeline)));
        }

        let health_state = Arc::new(HealthServerState::new(
            version,
            Arc::clone(&ingress),
            config.speech_enabled(),
        ));

        let grpc_addr = config.server.grpc_addr();
        let grpc_listener = TcpListener::bind(grpc_addr)
            .await
            .map_err(|e| SupervisorError::Bind {
                listener: "grpc",
                addr: grpc_addr,
                message: e.to_string(),
            })?;

        let gateway = GatewayServer::bind(config.server.gateway_addr(), router, cancel.clone())
            .await
            .map_err(|e| match e {
                GatewayError::BindFailed(addr, message) => SupervisorError::Bind {
                    listener: "gateway",
                    addr,
                    message,
                },
                GatewayError::ServerFailed(message) => SupervisorError::Server {
                    server: "gateway",
                    message,
                },
            })?;

        let health = HealthServer::bind(
            config.server.health_addr(),
            Arc::clone(&health_state),
            cancel.clone(),
        )
        .await
        .map_err(|e| match e {
            HealthServerError::BindFailed(addr, message) => SupervisorError::Bind {
                listener: "health",
                addr,
                message,
            },
            HealthServerError::ServerFailed(message) => SupervisorError::Server {
                server: "health",
                message,
            },
        })?;

        let addrs = BoundAddrs {
            grpc: local_addr(&grpc_listener.local_addr(), "grpc", grpc_addr)?,
            gateway: local_addr(&gateway.local_addr(), "gateway", config.server.gateway_addr())?,
            health: local_addr(&health.local_addr(), "health", config.server.health_addr())?,
        };

        Ok(Self {
            config,
            registry,
            ingress,
            gateway_state,
            health_state,
            grpc_listener,
            gateway,
            health,
            addrs,
            cancel,
        })
    }

    /// Addresses the listeners are bound to.
    #[must_use]
    pub const fn addrs(&self) -> BoundAddrs {
        self.addrs
    }

    /// The shared subscriber registry.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// The shared frame ingress.
    #[must_use]
    pub const fn ingress(&self) -> &Arc<FrameIngress> {
        &self.ingress
    }

    /// Serve until the cancellation token fires or a server exits.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Server` if any server failed or exited
    /// before shutdown was requested.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let Self {
            config,
            registry,
            ingress,
            gateway_state,
            health_state,
            grpc_listener,
            gateway,
            health,
            addrs,
            cancel,
        } = self;

        let mut servers: JoinSet<(&'static str, Result<(), String>)> = JoinSet::new();

        let grpc_service =
            FrameRelayServer::new(FrameRelayServerConfig::default(), ingress).into_service();
        let grpc_shutdown = cancel.clone();
        servers.spawn(async move {
            tracing::info!(addr = %addrs.grpc, "gRPC ingress listening");
            let result = Server::builder()
                .add_service(grpc_service)
                .serve_with_incoming_shutdown(
                    TcpListenerStream::new(grpc_listener),
                    grpc_shutdown.cancelled_owned(),
                )
                .await
                .map_err(|e| e.to_string());
            tracing::info!("gRPC ingress stopped");
            ("grpc", result)
        });
        servers.spawn(async move { ("gateway", gateway.run().await.map_err(|e| e.to_string())) });
        servers.spawn(async move { ("health", health.run().await.map_err(|e| e.to_string())) });

        health_state.mark_ready();
        tracing::info!(
            grpc = %addrs.grpc,
            gateway = %addrs.gateway,
            health = %addrs.health,
            speech = config.speech_enabled(),
            "Frame relay ready"
        );

        let mut failure = None;
        tokio::select! {
            () = cancel.cancelled() => {}
            Some(joined) = servers.join_next() => {
                failure = Some(early_exit(joined));
            }
        }

        health_state.mark_draining();
        cancel.cancel();
        tracing::info!(
            subscribers = registry.len(),
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Graceful shutdown started"
        );

        let drained = tokio::time::timeout(config.shutdown_timeout, async {
            gateway_state.drain_sessions().await;
            while let Some(joined) = servers.join_next().await {
                if let Some(error) = server_error(joined) {
                    tracing::error!(error = %error, "Server failed during shutdown");
                    failure.get_or_insert(error);
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout.as_secs(),
                "Shutdown timeout elapsed, aborting remaining tasks"
            );
            servers.abort_all();
        }

        tracing::info!("Frame relay stopped");
        failure.map_or(Ok(()), Err)
    }
}

fn local_addr(
    result: &std::io::Result<SocketAddr>,
    listener: &'static str,
    requested: SocketAddr,
) -> Result<SocketAddr, SupervisorError> {
    result.as_ref().copied().map_err(|e| SupervisorError::Bind {
        listener,
        addr: requested,
        message: e.to_string(),
    })
}

type Joined = Result<(&'static str, Result<(), String>), tokio::task::JoinError>;

fn server_error(joined: Joined) -> Option<SupervisorError> {
    match joined {
        Ok((_, Ok(()))) => None,
        Ok((server, Err(message))) => Some(SupervisorError::Server { server, message }),
        Err(e) => Some(SupervisorError::Server {
            server: "task",
            message: e.to_string(),
        }),
    }
}

/// A server finished while the relay was supposed to be serving.
fn early_exit(joined: Joined) -> SupervisorError {
    let error = match joined {
        Ok((server, Ok(()))) => SupervisorError::Server {
            server,
            message: "exited unexpectedly".to_string(),
        },
        other => server_error(other).unwrap_or_else(|| SupervisorError::Server {
            server: "task",
            message: "exited unexpectedly".to_string(),
        }),
    };
    tracing::error!(error = %error, "Server exited, shutting down");
    error
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use super::*;

    fn loopback_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.server.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.server.grpc_port = 0;
        config.server.gateway_port = 0;
        config.server.health_port = 0;
        config.shutdown_timeout = Duration::from_secs(2);
        config
    }

    #[tokio::test]
    async fn bind_reports_ephemeral_ports() {
        let supervisor = Supervisor::bind(loopback_config(), CancellationToken::new())
            .await
            .unwrap();
        let addrs = supervisor.addrs();

        assert_ne!(addrs.grpc.port(), 0);
        assert_ne!(addrs.gateway.port(), 0);
        assert_ne!(addrs.health.port(), 0);
        assert!(supervisor.registry().is_empty());
    }

    #[tokio::test]
    async fn bind_conflict_is_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = loopback_config();
        config.server.gateway_port = taken.local_addr().unwrap().port();

        let err = Supervisor::bind(config, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Bind { listener: "gateway", .. }));
    }

    #[tokio::test]
    async fn run_returns_ok_after_cancel() {
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::bind(loopback_config(), cancel.clone())
            .await
            .unwrap();

        let handle = tokio::spawn(supervisor.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn clean_exit_while_serving_is_a_failure() {
        let err = early_exit(Ok(("health", Ok(()))));
        assert!(matches!(err, SupervisorError::Server { server: "health", .. }));
    }
}
