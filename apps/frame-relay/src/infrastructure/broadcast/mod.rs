//! Subscriber Outbound Queues
//!
//! Implements the registry's [`FrameSink`] with a bounded tokio `mpsc`
//! channel per subscriber. The registry side only ever calls `try_send`;
//! the subscriber's writer task owns the receiver and performs socket I/O.
//!
//! # Architecture
//!
//! ```text
//! Registry::broadcast ──try_send──► [queue: capacity N] ──recv──► writer ──► WebSocket
//! ```
//!
//! A full queue means the subscriber is slower than the producer; the frame
//! is dropped for that subscriber only. A dropped receiver means the writer
//! is gone and the sink reports itself closed.

use tokio::sync::mpsc;

use crate::domain::frame::EncodedFrame;
use crate::domain::registry::{DeliveryError, FrameSink};
use crate::infrastructure::config::GatewaySettings;

// =============================================================================
// Configuration
// =============================================================================

/// Per-subscriber queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastConfig {
    /// Frames buffered per subscriber.
    pub subscriber_queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: GatewaySettings::default().subscriber_queue_capacity,
        }
    }
}

impl From<&GatewaySettings> for BroadcastConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            subscriber_queue_capacity: settings.subscriber_queue_capacity,
        }
    }
}

// =============================================================================
// Channel Sink
// =============================================================================

/// Receiving end of a subscriber queue, drained by the writer task.
pub type FrameReceiver = mpsc::Receiver<EncodedFrame>;

/// Registry-facing end of a subscriber queue.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<EncodedFrame>,
}

impl FrameSink for ChannelSink {
    fn try_deliver(&self, frame: &EncodedFrame) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ChannelSink {
    /// Free slots left in the queue.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Create a subscriber queue with the given capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn subscriber_channel(capacity: usize) -> (ChannelSink, FrameReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelSink { tx }, rx)
}

// =============================================================================
// Tests
// =============================================================================
