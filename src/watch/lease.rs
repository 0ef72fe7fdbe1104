//! Node lease watch subscription
//!
//! Kubelets renew a Lease object per node as their liveness signal. Every
//! add/modify event on the lease namespace becomes a "renewed" heartbeat,
//! timestamped with the lease's renew time when present.

use crate::error::{DecodeError, SubscriptionError};
use crate::store::{HeartbeatRecord, HeartbeatSource, HeartbeatStore};
use crate::watch::{SubscriptionOutcome, SubscriptionState};
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::coordination::v1::Lease;
use kube::{
    api::Api,
    runtime::watcher::{self, Event},
};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct LeaseSubscription {
    api: Api<Lease>,
    store: HeartbeatStore,
    shutdown: CancellationToken,
    state: SubscriptionState,
}

impl LeaseSubscription {
    pub fn new(api: Api<Lease>, store: HeartbeatStore, shutdown: CancellationToken) -> Self {
        Self {
            api,
            store,
            shutdown,
            state: SubscriptionState::Idle,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Run until the stream ends, fails, or shutdown is requested
    pub async fn run(mut self) -> SubscriptionOutcome {
        info!("Starting lease watch subscription");
        self.state = SubscriptionState::Subscribing;

        let config = watcher::Config::default();
        let mut stream = watcher::watcher(self.api.clone(), config).boxed();

        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Lease subscription cancelled");
                    self.state = SubscriptionState::Closed;
                    return SubscriptionOutcome::Closed;
                }
                event = stream.try_next() => event,
            };

            match event {
                Ok(Some(event)) => {
                    process_event(event, &mut self.state, &self.store);
                }
                Ok(None) => {
                    info!("Lease watch stream ended");
                    self.state = SubscriptionState::Closed;
                    return SubscriptionOutcome::Closed;
                }
                Err(e) => {
                    error!("Lease watch stream failed: {}", e);
                    let failure = if self.state == SubscriptionState::Subscribing {
                        SubscriptionError::Subscribe {
                            stream: HeartbeatSource::Lease,
                            reason: e.to_string(),
                        }
                    } else {
                        SubscriptionError::Stream {
                            stream: HeartbeatSource::Lease,
                            reason: e.to_string(),
                        }
                    };
                    self.state = SubscriptionState::Failed;
                    return SubscriptionOutcome::Failed(failure);
                }
            }
        }
    }
}

fn process_event(event: Event<Lease>, state: &mut SubscriptionState, store: &HeartbeatStore) {
    if *state == SubscriptionState::Subscribing {
        *state = SubscriptionState::Streaming;
    }

    match event {
        Event::Apply(lease) | Event::InitApply(lease) => match normalize_lease(&lease) {
            Ok(record) => {
                debug!("Lease renewal: {}", record.subject_name);
                store.append(record);
            }
            Err(e) => {
                warn!("Skipping undecodable lease event: {}", e);
            }
        },
        Event::Delete(lease) => {
            debug!(
                "Lease deleted: {}",
                lease.metadata.name.as_deref().unwrap_or("unknown")
            );
        }
        Event::Init => {
            debug!("Lease watch re-listing");
        }
        Event::InitDone => {
            info!("Lease watch initial sync complete");
        }
    }
}

/// Normalize a lease object into a heartbeat record
///
/// The lease name is the node identity. The record is timestamped with the
/// lease's renew time; leases that have never been renewed fall back to the
/// time of observation.
pub fn normalize_lease(lease: &Lease) -> Result<HeartbeatRecord, DecodeError> {
    let name = lease
        .metadata
        .name
        .as_deref()
        .ok_or(DecodeError::MissingField {
            kind: "Lease",
            field: "metadata.name",
        })?;

    let timestamp = lease
        .spec
        .as_ref()
        .and_then(|s| s.renew_time.as_ref())
        .map(|t| SystemTime::from(t.0))
        .unwrap_or_else(SystemTime::now);

    Ok(HeartbeatRecord {
        source: HeartbeatSource::Lease,
        subject_name: name.to_string(),
        namespace: None,
        observed_status: "renewed".to_string(),
        timestamp,
    })
}
