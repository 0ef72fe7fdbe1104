//! Watch-stream ingestion
//!
//! One long-lived subscription per external event source (pod status, node
//! leases). Subscriptions run as independent tokio tasks that normalize raw
//! watch events into heartbeat records and publish them through the shared
//! store; a failure on one stream never touches its sibling.

pub mod lease;
pub mod pod;

pub use lease::LeaseSubscription;
pub use pod::PodSubscription;

use crate::error::SubscriptionError;
use crate::k8s::K8sClient;
use crate::store::{HeartbeatSource, HeartbeatStore};
use k8s_openapi::api::coordination::v1::Lease;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a single watch subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Subscribing,
    Streaming,
    Closed,
    Failed,
}

/// Terminal report a subscription hands back to its owner
///
/// `Closed` is the clean terminal state (stream ended or cancellation
/// requested) and is eligible for resubscription; the core itself never
/// retries.
#[derive(Debug)]
pub enum SubscriptionOutcome {
    Closed,
    Failed(SubscriptionError),
}

/// Owns one subscription per external stream and spawns them as tasks
pub struct WatchDispatcher {
    pods: Api<Pod>,
    leases: Api<Lease>,
    store: HeartbeatStore,
    shutdown: CancellationToken,
}

impl WatchDispatcher {
    pub fn new(
        client: &K8sClient,
        lease_namespace: &str,
        store: HeartbeatStore,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pods: client.pods_all(),
            leases: client.leases(lease_namespace),
            store,
            shutdown,
        }
    }

    /// Spawn both subscriptions; each runs until its stream ends, fails, or
    /// the shutdown token is cancelled
    pub fn spawn(self) -> Vec<(HeartbeatSource, JoinHandle<SubscriptionOutcome>)> {
        let pod = PodSubscription::new(self.pods, self.store.clone(), self.shutdown.clone());
        let lease = LeaseSubscription::new(self.leases, self.store, self.shutdown);

        vec![
            (HeartbeatSource::Pod, tokio::spawn(pod.run())),
            (HeartbeatSource::Lease, tokio::spawn(lease.run())),
        ]
    }
}
