//! Registration guard tying a subscriber's registry entry to its session.

use crate::domain::registry::{SharedRegistry, SubscriberHandle, SubscriberId};
use crate::infrastructure::metrics;

/// Keeps a subscriber registered for as long as the guard lives.
///
/// Dropping the guard unregisters the subscriber exactly once, whichever
/// way the session ended. If the registry already evicted the handle after
/// a failed delivery, the drop is a no-op.
#[derive(Debug)]
pub struct RegistrationGuard {
    registry: SharedRegistry,
    id: SubscriberId,
}

impl RegistrationGuard {
    /// Register `handle` and return the guard owning its registration.
    ///
    /// The guard keeps only the id so the registry holds the last reference
    /// to the send capability.
    #[must_use]
    pub fn register(registry: SharedRegistry, handle: SubscriberHandle) -> Self {
        let id = handle.id();
        registry.register(handle);
        metrics::set_subscribers(registry.len());
        Self { registry, id }
    }

    /// Id of the guarded subscriber.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let removed = self.registry.unregister(self.id);
        metrics::set_subscribers(self.registry.len());
        tracing::debug!(subscriber_id = self.id, removed, "Subscriber unregistered");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::registry::SubscriberRegistry;
    use crate::infrastructure::broadcast::subscriber_channel;

    #[test]
    fn drop_unregisters() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, _rx) = subscriber_channel(1);

        let guard = RegistrationGuard::register(Arc::clone(&registry), SubscriberHandle::new(Arc::new(sink)));
        let id = guard.id();
        assert!(registry.contains(id));

        drop(guard);
        assert!(!registry.contains(id));
    }

    #[test]
    fn drop_after_eviction_is_harmless() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, _rx) = subscriber_channel(1);

        let guard = RegistrationGuard::register(Arc::clone(&registry), SubscriberHandle::new(Arc::new(sink)));
        assert!(registry.unregister(guard.id()));

        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn guard_does_not_keep_queue_open() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sink, mut rx) = subscriber_channel(1);

        let guard = RegistrationGuard::register(Arc::clone(&registry), SubscriberHandle::new(Arc::new(sink)));
        registry.unregister(guard.id());

        // The registry held the last sender, so the writer sees the end.
        assert!(rx.try_recv().is_err());
        assert!(rx.is_closed());
    }
}
