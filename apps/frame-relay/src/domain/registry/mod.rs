//! Subscriber Registry
//!
//! The single source of truth for "who is currently listening". The gateway
//! registers and unregisters subscriber handles; the ingress broadcasts
//! encoded frames to whatever set is registered at that moment.
//!
//! # Design
//!
//! - Membership lives in a `RwLock<HashMap<SubscriberId, SubscriberHandle>>`.
//! - `broadcast` clones a snapshot of the handles under the read lock and
//!   releases it before delivering. The lock is never held across a send.
//! - Delivery goes through [`FrameSink::try_deliver`], which must not block.
//!   A full subscriber queue drops the frame for that subscriber only; a
//!   closed subscriber is removed once every handle in the round was tried.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::domain::frame::EncodedFrame;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a subscriber connection.
pub type SubscriberId = u64;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Why a frame could not be handed to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The subscriber's outbound queue is saturated (slow consumer).
    #[error("subscriber queue is full")]
    Full,
    /// The subscriber's connection is gone.
    #[error("subscriber connection is closed")]
    Closed,
}

/// Send capability of one subscriber connection.
///
/// Implementations must return immediately; any socket I/O happens
/// elsewhere (see `infrastructure::broadcast`).
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink: Send + Sync {
    /// Hand one encoded frame to the subscriber without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Full`] when the frame was dropped for this
    /// subscriber, [`DeliveryError::Closed`] when the connection is dead.
    fn try_deliver(&self, frame: &EncodedFrame) -> Result<(), DeliveryError>;

    /// Whether the underlying connection is known to be gone.
    fn is_closed(&self) -> bool;
}

/// Liveness of a subscriber as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The connection accepts frames.
    Alive,
    /// The connection is gone and the handle awaits removal.
    Failed,
}

/// Registry-side reference to one live subscriber connection.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    sink: Arc<dyn FrameSink>,
}

impl SubscriberHandle {
    /// Wrap a send capability into a handle with a fresh identity.
    #[must_use]
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            sink,
        }
    }

    /// The handle's identity.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Current liveness of the connection.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        if self.sink.is_closed() {
            Liveness::Failed
        } else {
            Liveness::Alive
        }
    }

    fn try_deliver(&self, frame: &EncodedFrame) -> Result<(), DeliveryError> {
        self.sink.try_deliver(frame)
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("liveness", &self.liveness())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Broadcast Report
// =============================================================================

/// Outcome of one fan-out round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Handles in the snapshot.
    pub recipients: usize,
    /// Handles that accepted the frame.
    pub delivered: usize,
    /// Handles that dropped the frame because their queue was full.
    pub dropped: usize,
    /// Handles found closed during this round.
    pub failed: usize,
    /// Closed handles actually removed by this round.
    pub removed: Vec<SubscriberId>,
}

// =============================================================================
// Subscriber Registry
// =============================================================================

/// Synchronized set of live subscriber handles.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use frame_relay::domain::registry::SubscriberRegistry;
/// use frame_relay::infrastructure::broadcast::subscriber_channel;
///
/// let registry = SubscriberRegistry::new();
/// let (sink, _rx) = subscriber_channel(8);
/// let handle = frame_relay::SubscriberHandle::new(Arc::new(sink));
///
/// registry.register(handle.clone());
/// assert_eq!(registry.len(), 1);
///
/// assert!(registry.unregister(handle.id()));
/// assert!(!registry.unregister(handle.id()));
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, SubscriberHandle>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle to the set.
    ///
    /// Registering the same handle again replaces the entry, so a handle is
    /// never sent a frame twice in one round. Returns `true` if the handle
    /// was not registered before.
    pub fn register(&self, handle: SubscriberHandle) -> bool {
        self.subscribers.write().insert(handle.id, handle).is_none()
    }

    /// Remove a handle if present.
    ///
    /// Returns `true` if this call removed it. Calling it again for the same
    /// id is a no-op.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.write().remove(&id).is_some()
    }

    /// Deliver a frame to every registered handle.
    ///
    /// Never blocks on a subscriber and never fails: each handle's outcome
    /// is independent of the others. Handles reporting
    /// [`DeliveryError::Closed`] are removed after all sends were attempted.
    pub fn broadcast(&self, frame: &EncodedFrame) -> BroadcastReport {
        let snapshot = self.snapshot();
        let mut report = BroadcastReport {
            recipients: snapshot.len(),
            ..BroadcastReport::default()
        };

        let mut closed = Vec::new();
        for handle in &snapshot {
            match handle.try_deliver(frame) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Full) => report.dropped += 1,
                Err(DeliveryError::Closed) => closed.push(handle.id),
            }
        }
        report.failed = closed.len();

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write();
            report.removed = closed
                .into_iter()
                .filter(|id| subscribers.remove(id).is_some())
                .collect();
        }

        report
    }

    /// Clone the current set of handles.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Whether a handle is registered.
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    /// Ids of all registered handles.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscribers.read().keys().copied().collect()
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether no handle is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

/// Shared registry reference.
pub type SharedRegistry = Arc<SubscriberRegistry>;

// =============================================================================
// Tests
// =============================================================================
