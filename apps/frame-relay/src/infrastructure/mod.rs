//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the servers, the concrete implementations of the
//! port interfaces defined in the application layer, and the ambient stack.

/// Per-subscriber outbound queues.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// WebSocket subscriber gateway and viewer page.
pub mod gateway;

/// gRPC frame ingress server.
pub mod grpc;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Speech translation adapters and HTTP routes.
pub mod speech;

/// Startup ordering and graceful shutdown.
pub mod supervisor;

/// OpenTelemetry tracing integration.
pub mod telemetry;
