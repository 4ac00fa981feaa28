#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Frame Relay - Real-time Image Frame Fan-out
//!
//! Producers push encoded image frames over gRPC; every accepted frame is
//! pushed to all connected WebSocket viewers as a base64 data URI, with
//! best-effort, at-most-once delivery per subscriber.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Frames, the subscriber registry and speech value types
//!   - `frame`: Validation, media type detection, data URI encoding
//!   - `registry`: Synchronized set of live subscribers and fan-out
//!   - `speech`: Voices, encodings, uploaded audio
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Transcription, translation, synthesis and audio storage
//!   - `services`: Frame ingress and the translation pipeline
//!
//! - **Infrastructure**: Servers and adapters
//!   - `grpc`: Frame ingress server
//!   - `gateway`: WebSocket subscriber gateway and viewer page
//!   - `broadcast`: Per-subscriber outbound queues
//!   - `speech`: Hosted speech API clients, audio store, HTTP routes
//!   - `supervisor`: Startup and graceful shutdown
//!   - `config`, `health`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! Producer ──gRPC──► FrameIngress ──► SubscriberRegistry::broadcast
//!                                          │
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!                   queue 1            queue 2            queue N
//!                       │                  │                  │
//!                   session 1          session 2          session N ──WS──► Viewer
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core relay types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Servers, adapters and ambient stack.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::frame::{EncodedFrame, Frame, FrameError, FrameLimits, ImageMediaType};
pub use domain::registry::{
    BroadcastReport, DeliveryError, FrameSink, Liveness, SharedRegistry, SubscriberHandle,
    SubscriberId, SubscriberRegistry,
};

// Services
pub use application::services::{
    FrameIngress, IngressReceipt, PipelineError, RelayStats, RelayStatsSnapshot,
    TranslationPipeline,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, GatewaySettings, IngressSettings, RelayConfig, ServerSettings,
    SpeechCredentials, SpeechSettings,
};

// Servers (for integration tests)
pub use infrastructure::gateway::{GatewayConfig, GatewayServer, GatewayState};
pub use infrastructure::grpc::{
    ACK_MESSAGE, FrameRelayServer, FrameRelayServerConfig, proto::relay::v1 as proto,
};
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::supervisor::{BoundAddrs, Supervisor, SupervisorError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
