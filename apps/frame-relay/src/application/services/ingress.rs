//! Frame Ingress Service
//!
//! Turns submitted payloads into broadcast frames: validate, assign a
//! sequence number, encode once, fan out through the registry.
//!
//! `submit` never awaits. Fan-out runs inline on the caller's task so that
//! frames from one producer reach every subscriber queue in acceptance order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::frame::{self, Frame, FrameError, FrameLimits};
use crate::domain::registry::{BroadcastReport, SharedRegistry};

/// Outcome of one accepted frame.
#[derive(Debug, Clone)]
pub struct IngressReceipt {
    /// Sequence number assigned to the frame.
    pub sequence: u64,
    /// Resolved media type.
    pub media_type: String,
    /// Fan-out outcome.
    pub report: BroadcastReport,
    /// Time spent in the fan-out round.
    pub broadcast_duration: Duration,
}

// =============================================================================
// Relay Statistics
// =============================================================================

/// Counters maintained by the ingress.
#[derive(Debug)]
pub struct RelayStats {
    started_at: DateTime<Utc>,
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    deliveries: AtomicU64,
    dropped_deliveries: AtomicU64,
    failed_deliveries: AtomicU64,
    last_frame_at: RwLock<Option<DateTime<Utc>>>,
}

impl Default for RelayStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            frames_received: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            dropped_deliveries: AtomicU64::new(0),
            failed_deliveries: AtomicU64::new(0),
            last_frame_at: RwLock::new(None),
        }
    }
}

impl RelayStats {
    fn record_accepted(&self, received_at: DateTime<Utc>, report: &BroadcastReport) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.dropped_deliveries
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.failed_deliveries
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        *self.last_frame_at.write() = Some(received_at);
    }

    fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            started_at: self.started_at,
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_deliveries: self.dropped_deliveries.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
            last_frame_at: *self.last_frame_at.read(),
        }
    }
}

/// Copy of [`RelayStats`] at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// When the relay started.
    pub started_at: DateTime<Utc>,
    /// Frames accepted.
    pub frames_received: u64,
    /// Frames rejected by validation.
    pub frames_rejected: u64,
    /// Frames queued to subscribers.
    pub deliveries: u64,
    /// Frames dropped for saturated subscribers.
    pub dropped_deliveries: u64,
    /// Deliveries that found the subscriber closed.
    pub failed_deliveries: u64,
    /// Arrival time of the latest accepted frame.
    pub last_frame_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Frame Ingress
// =============================================================================

/// Validates frames and hands them to the registry.
#[derive(Debug)]
pub struct FrameIngress {
    registry: SharedRegistry,
    limits: FrameLimits,
    next_sequence: AtomicU64,
    stats: RelayStats,
}

impl FrameIngress {
    /// Create an ingress broadcasting into `registry`.
    #[must_use]
    pub fn new(registry: SharedRegistry, limits: FrameLimits) -> Self {
        Self {
            registry,
            limits,
            next_sequence: AtomicU64::new(1),
            stats: RelayStats::default(),
        }
    }

    /// Validate, encode and broadcast one frame.
    ///
    /// Returns as soon as every subscriber queue was offered the frame.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if validation fails; the registry is not
    /// touched in that case.
    pub fn submit(&self, data: Bytes, declared_media_type: &str) -> Result<IngressReceipt, FrameError> {
        let media_type = match frame::validate(&data, declared_media_type, &self.limits) {
            Ok(media_type) => media_type,
            Err(e) => {
                self.stats.record_rejected();
                return Err(e);
            }
        };

        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::new(sequence, data, media_type);
        let encoded = frame.encode();

        let start = Instant::now();
        let report = self.registry.broadcast(&encoded);
        let broadcast_duration = start.elapsed();

        self.stats.record_accepted(frame.received_at(), &report);

        Ok(IngressReceipt {
            sequence,
            media_type: frame.media_type().to_string(),
            report,
            broadcast_duration,
        })
    }

    /// The registry frames are broadcast into.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Ingress counters.
    #[must_use]
    pub const fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Active limits.
    #[must_use]
    pub const fn limits(&self) -> &FrameLimits {
        &self.limits
    }
}

// =============================================================================
// Tests
// =============================================================================
