//! kubepulse correlates kernel-reported process telemetry with the
//! Kubernetes workloads that produced it, and aggregates pod status and
//! node lease heartbeats into a queryable in-memory store.

pub mod cli;
pub mod correlate;
pub mod error;
pub mod k8s;
pub mod registry;
pub mod store;
pub mod watch;

pub use correlate::{CorrelationEngine, CorrelationResult, TelemetryEvent};
pub use error::{Error, Result};
pub use registry::{WorkloadIdentity, WorkloadRegistry};
pub use store::{HeartbeatRecord, HeartbeatSource, HeartbeatStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
