//! Pod watch subscription
//!
//! Watches pods cluster-wide and turns add/modify events into pod
//! heartbeats. Deletions are lifecycle information, not liveness, so they
//! are logged and skipped.

use crate::error::{DecodeError, SubscriptionError};
use crate::store::{HeartbeatRecord, HeartbeatSource, HeartbeatStore};
use crate::watch::{SubscriptionOutcome, SubscriptionState};
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::Api,
    runtime::watcher::{self, Event},
};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct PodSubscription {
    api: Api<Pod>,
    store: HeartbeatStore,
    shutdown: CancellationToken,
    state: SubscriptionState,
}

impl PodSubscription {
    pub fn new(api: Api<Pod>, store: HeartbeatStore, shutdown: CancellationToken) -> Self {
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
        info!("Starting pod watch subscription");
        self.state = SubscriptionState::Subscribing;

        let config = watcher::Config::default();
        let mut stream = watcher::watcher(self.api.clone(), config).boxed();

        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Pod subscription cancelled");
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
                    info!("Pod watch stream ended");
                    self.state = SubscriptionState::Closed;
                    return SubscriptionOutcome::Closed;
                }
                Err(e) => {
                    error!("Pod watch stream failed: {}", e);
                    let failure = if self.state == SubscriptionState::Subscribing {
                        SubscriptionError::Subscribe {
                            stream: HeartbeatSource::Pod,
                            reason: e.to_string(),
                        }
                    } else {
                        SubscriptionError::Stream {
                            stream: HeartbeatSource::Pod,
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

/// Handle one watch event: normalize-and-publish, or skip
///
/// Decode mismatches are non-fatal; the subscription keeps streaming.
fn process_event(event: Event<Pod>, state: &mut SubscriptionState, store: &HeartbeatStore) {
    if *state == SubscriptionState::Subscribing {
        *state = SubscriptionState::Streaming;
    }

    match event {
        Event::Apply(pod) | Event::InitApply(pod) => match normalize_pod(&pod) {
            Ok(record) => {
                debug!(
                    "Pod heartbeat: {} ({})",
                    record.subject_name, record.observed_status
                );
                store.append(record);
            }
            Err(e) => {
                warn!("Skipping undecodable pod event: {}", e);
            }
        },
        Event::Delete(pod) => {
            // Deletion is not liveness information; log only
            info!(
                "Pod deleted: {}/{}",
                pod.metadata.namespace.as_deref().unwrap_or("default"),
                pod.metadata.name.as_deref().unwrap_or("unknown")
            );
        }
        Event::Init => {
            debug!("Pod watch re-listing");
        }
        Event::InitDone => {
            info!("Pod watch initial sync complete");
        }
    }
}

/// Normalize a pod object into a heartbeat record
///
/// The pod phase is the observed status; a pod without one is reported as
/// "Unknown" rather than dropped.
pub fn normalize_pod(pod: &Pod) -> Result<HeartbeatRecord, DecodeError> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .ok_or(DecodeError::MissingField {
            kind: "Pod",
            field: "metadata.name",
        })?;

    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(HeartbeatRecord {
        source: HeartbeatSource::Pod,
        subject_name: name.to_string(),
        namespace: pod.metadata.namespace.clone(),
        observed_status: phase,
        timestamp: SystemTime::now(),
    })
}
