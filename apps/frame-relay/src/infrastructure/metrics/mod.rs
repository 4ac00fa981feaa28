//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ingress**: Frames received and rejected by ingress kind
//! - **Fan-out**: Deliveries, dropped deliveries and failed subscribers
//! - **Subscribers**: Connected subscriber count and connection churn
//! - **Speech**: Translation runs and failures by pipeline stage
//! - **Latency**: Broadcast round duration
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::registry::BroadcastReport;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            #[allow(clippy::expect_used)]
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Ingress counters
    describe_counter!(
        "frame_relay_frames_received_total",
        "Total frames accepted from producers"
    );
    describe_counter!(
        "frame_relay_frames_rejected_total",
        "Total frames rejected by validation"
    );

    // Fan-out counters
    describe_counter!(
        "frame_relay_deliveries_total",
        "Total frames queued to subscribers"
    );
    describe_counter!(
        "frame_relay_deliveries_dropped_total",
        "Total frames dropped due to full subscriber queues"
    );
    describe_counter!(
        "frame_relay_deliveries_failed_total",
        "Total deliveries to closed subscribers"
    );

    // Subscribers
    describe_gauge!(
        "frame_relay_subscribers",
        "Number of registered subscribers"
    );
    describe_counter!(
        "frame_relay_subscriber_connections_total",
        "Total subscriber connections accepted"
    );
    describe_counter!(
        "frame_relay_subscriber_disconnections_total",
        "Total subscriber sessions ended by reason"
    );

    // Speech pipeline
    describe_counter!(
        "frame_relay_translations_total",
        "Total completed speech translations"
    );
    describe_counter!(
        "frame_relay_translation_failures_total",
        "Total failed speech translations by stage"
    );

    // Latency histograms
    describe_histogram!(
        "frame_relay_broadcast_seconds",
        "Time to fan one frame out to all subscriber queues"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for ingress kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressKind {
    /// One frame per `SendFrame` call.
    Unary,
    /// Frames from a `StreamFrames` call.
    Stream,
}

impl IngressKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::Stream => "stream",
        }
    }
}

/// Record an accepted frame.
pub fn record_frame_received(ingress: IngressKind) {
    counter!(
        "frame_relay_frames_received_total",
        "ingress" => ingress.as_str()
    )
    .increment(1);
}

/// Record a rejected frame.
pub fn record_frame_rejected(ingress: IngressKind, reason: &'static str) {
    counter!(
        "frame_relay_frames_rejected_total",
        "ingress" => ingress.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record the outcome of one fan-out round.
pub fn record_broadcast(report: &BroadcastReport, duration: Duration) {
    counter!("frame_relay_deliveries_total").increment(report.delivered as u64);
    counter!("frame_relay_deliveries_dropped_total").increment(report.dropped as u64);
    counter!("frame_relay_deliveries_failed_total").increment(report.failed as u64);
    histogram!("frame_relay_broadcast_seconds").record(duration.as_secs_f64());
}

/// Update the registered subscriber count.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribers(count: usize) {
    gauge!("frame_relay_subscribers").set(count as f64);
}

/// Record an accepted subscriber connection.
pub fn record_subscriber_connected() {
    counter!("frame_relay_subscriber_connections_total").increment(1);
}

/// Record a finished subscriber session.
pub fn record_subscriber_disconnected(reason: &'static str) {
    counter!(
        "frame_relay_subscriber_disconnections_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record a completed translation.
pub fn record_translation_completed() {
    counter!("frame_relay_translations_total").increment(1);
}

/// Record a failed translation.
pub fn record_translation_failed(stage: &'static str) {
    counter!(
        "frame_relay_translation_failures_total",
        "stage" => stage
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
