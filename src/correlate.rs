//! Correlation of kernel telemetry events with Kubernetes workloads

use crate::registry::{WorkloadIdentity, WorkloadRegistry};
use std::sync::Arc;

/// A process lifecycle event delivered by the kernel capture collaborator
///
/// Arrives already parsed; consumed exactly once per correlation. Duplicate
/// deliveries are harmless since correlation has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub pid: u32,
    pub ppid: u32,
    pub command: String,
    pub cgroup_path: String,
    /// Nanoseconds since boot, as reported by the kernel
    pub timestamp_ns: u64,
}

/// Outcome of correlating one telemetry event
///
/// `Unmatched` is a first-class expected result (system processes, stale
/// paths after pod teardown), not a failure; it preserves the original
/// event fields so nothing is lost for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelationResult {
    Matched {
        workload: WorkloadIdentity,
    },
    Unmatched {
        cgroup_path: String,
        pid: u32,
        command: String,
        timestamp_ns: u64,
    },
}

impl std::fmt::Display for CorrelationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationResult::Matched { workload } => write!(
                f,
                "matched pod {} (namespace: {}, node: {})",
                workload.name, workload.namespace, workload.node_name
            ),
            CorrelationResult::Unmatched {
                cgroup_path,
                pid,
                command,
                ..
            } => write!(
                f,
                "unmatched event: pid={}, command={}, cgroup={}",
                pid, command, cgroup_path
            ),
        }
    }
}

/// Resolves telemetry events against the workload registry
pub struct CorrelationEngine {
    registry: Arc<WorkloadRegistry>,
}

impl CorrelationEngine {
    pub fn new(registry: Arc<WorkloadRegistry>) -> Self {
        Self { registry }
    }

    /// Correlate one event: exactly one registry lookup, no side effects
    pub fn correlate(&self, event: TelemetryEvent) -> CorrelationResult {
        match self.registry.lookup(&event.cgroup_path) {
            Some(workload) => CorrelationResult::Matched { workload },
            None => CorrelationResult::Unmatched {
                cgroup_path: event.cgroup_path,
                pid: event.pid,
                command: event.command,
                timestamp_ns: event.timestamp_ns,
            },
        }
    }
}
