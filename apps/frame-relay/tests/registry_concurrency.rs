//! Registry Concurrency Tests
//!
//! Hammers the shared registry with concurrent frame submissions and
//! subscriber churn and checks that membership and delivery stay consistent.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;

use frame_relay::infrastructure::broadcast::subscriber_channel;
use frame_relay::infrastructure::gateway::RegistrationGuard;
use frame_relay::{FrameIngress, FrameLimits, SubscriberHandle, SubscriberRegistry};

const SUBMITS: usize = 50;
const CHURN: usize = 50;

fn jpeg(n: u8) -> Bytes {
    Bytes::from(vec![0xFF, 0xD8, 0xFF, 0xE0, n])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_and_churn_keep_membership_consistent() {
    let registry = Arc::new(SubscriberRegistry::new());
    let ingress = Arc::new(FrameIngress::new(Arc::clone(&registry), FrameLimits::default()));

    let mut stable = Vec::new();
    let mut guards = Vec::new();
    for _ in 0..3 {
        let (sink, rx) = subscriber_channel(SUBMITS * 2);
        guards.push(RegistrationGuard::register(
            Arc::clone(&registry),
            SubscriberHandle::new(Arc::new(sink)),
        ));
        stable.push(rx);
    }

    let mut tasks = JoinSet::new();
    for i in 0..SUBMITS {
        let ingress = Arc::clone(&ingress);
        tasks.spawn(async move {
            let n = u8::try_from(i).unwrap();
            ingress.submit(jpeg(n), "").unwrap();
        });
    }
    for _ in 0..CHURN {
        let registry = Arc::clone(&registry);
        tasks.spawn(async move {
            let (sink, _rx) = subscriber_channel(4);
            let guard = RegistrationGuard::register(
                Arc::clone(&registry),
                SubscriberHandle::new(Arc::new(sink)),
            );
            assert!(registry.contains(guard.id()));
            tokio::task::yield_now().await;
            let id = guard.id();
            drop(guard);
            assert!(!registry.contains(id));
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    assert_eq!(registry.len(), guards.len());
    assert_eq!(ingress.stats().snapshot().frames_received, SUBMITS as u64);

    for mut rx in stable {
        let mut sequences = HashSet::new();
        while let Ok(frame) = rx.try_recv() {
            assert!(sequences.insert(frame.sequence()));
        }
        assert_eq!(sequences.len(), SUBMITS);
    }

    drop(guards);
    assert!(registry.is_empty());
}

#[test]
fn closed_subscriber_is_pruned_without_affecting_others() {
    let registry = Arc::new(SubscriberRegistry::new());
    let ingress = FrameIngress::new(Arc::clone(&registry), FrameLimits::default());

    let (live, mut live_rx) = subscriber_channel(4);
    let (dead, dead_rx) = subscriber_channel(4);
    let live = SubscriberHandle::new(Arc::new(live));
    let dead = SubscriberHandle::new(Arc::new(dead));
    let dead_id = dead.id();
    registry.register(live);
    registry.register(dead);
    drop(dead_rx);

    let receipt = ingress.submit(jpeg(1), "image/jpeg").unwrap();

    assert_eq!(receipt.report.delivered, 1);
    assert_eq!(receipt.report.removed, vec![dead_id]);
    assert!(!registry.contains(dead_id));
    assert_eq!(registry.len(), 1);
    assert!(live_rx.try_recv().is_ok());
}

#[test]
fn unregistered_subscriber_receives_nothing() {
    let registry = Arc::new(SubscriberRegistry::new());
    let ingress = FrameIngress::new(Arc::clone(&registry), FrameLimits::default());

    let (sink, mut rx) = subscriber_channel(4);
    let handle = SubscriberHandle::new(Arc::new(sink));
    let id = handle.id();
    registry.register(handle);
    assert!(registry.unregister(id));
    assert!(!registry.unregister(id));

    let receipt = ingress.submit(jpeg(2), "").unwrap();

    assert_eq!(receipt.report.recipients, 0);
    assert!(rx.try_recv().is_err());
}
