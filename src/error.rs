use crate::store::HeartbeatSource;
use std::time::Duration;
use thiserror::Error;

/// Failure refreshing the workload registry.
///
/// Never fatal: the previous snapshot stays authoritative until the next
/// successful refresh, and retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("workload listing failed: {0}")]
    Listing(String),

    #[error("workload listing timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Irrecoverable failure of one watch subscription.
///
/// Scoped to a single stream; sibling subscriptions keep running and the
/// owner decides whether to resubscribe.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("failed to open {stream} watch stream: {reason}")]
    Subscribe {
        stream: HeartbeatSource,
        reason: String,
    },

    #[error("{stream} watch stream failed: {reason}")]
    Stream {
        stream: HeartbeatSource,
        reason: String,
    },
}

/// A watch event's object did not match the expected shape.
///
/// Skip-and-continue: the event is dropped and logged, the subscription
/// keeps processing the stream.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{kind} event missing required field {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("Kubernetes error: {0}")]
    Kubernetes(String),
}

pub type Result<T> = std::result::Result<T, Error>;
