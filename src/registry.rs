//! Workload registry: the cgroup-path to workload-identity index
//!
//! The registry is rebuilt wholesale from an external workload listing and
//! swapped in atomically, so lookups running during a refresh keep seeing
//! the previous snapshot until the swap completes. The per-refresh index
//! makes `lookup` a single hash probe instead of a scan over every
//! workload's paths.

use crate::error::RegistryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Default prefix for the template-based cgroup path construction
pub const DEFAULT_CGROUP_PREFIX: &str = "/sys/fs/cgroup/kubepods";

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity of a Kubernetes workload as seen by the correlation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadIdentity {
    pub name: String,
    pub namespace: String,
    pub node_name: String,
    pub container_ids: Vec<String>,
    pub cgroup_paths: Vec<String>,
}

/// Raw workload row returned by a lister, before cgroup paths are attached
#[derive(Debug, Clone)]
pub struct WorkloadListing {
    pub name: String,
    pub namespace: String,
    pub node_name: String,
    pub container_ids: Vec<String>,
}

/// External collaborator that lists the cluster's current workloads
#[async_trait]
pub trait WorkloadLister: Send + Sync {
    async fn list_workloads(&self) -> Result<Vec<WorkloadListing>, RegistryError>;
}

/// Maps a container id to the cgroup path the kernel will report for it
///
/// Accurate resolution depends on the container runtime and cgroup driver
/// in use, so it is supplied by the caller rather than guessed here.
pub trait CgroupPathResolver: Send + Sync {
    fn resolve(&self, container_id: &str) -> Option<String>;
}

/// Resolver that joins a fixed prefix with the container id
///
/// This matches the `<prefix>/<container-id>` construction contract and is
/// a stand-in: deployments should provide a resolver that understands their
/// runtime's real cgroup layout (e.g. containerd's systemd slice scheme).
pub struct TemplateResolver {
    prefix: String,
}

impl TemplateResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CGROUP_PREFIX)
    }
}

impl CgroupPathResolver for TemplateResolver {
    fn resolve(&self, container_id: &str) -> Option<String> {
        if container_id.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}",
            self.prefix.trim_end_matches('/'),
            container_id
        ))
    }
}

/// One immutable generation of the registry
///
/// Built off to the side during a refresh and published with a single
/// pointer swap; never mutated after construction.
#[derive(Debug, Default)]
struct RegistrySnapshot {
    workloads: Vec<WorkloadIdentity>,
    by_cgroup_path: HashMap<String, usize>,
    collisions: usize,
}

impl RegistrySnapshot {
    fn build(listing: Vec<WorkloadListing>, resolver: &dyn CgroupPathResolver) -> Self {
        let mut workloads = Vec::with_capacity(listing.len());
        let mut by_cgroup_path = HashMap::new();
        let mut collisions = 0;

        for row in listing {
            let mut cgroup_paths = Vec::new();
            for container_id in &row.container_ids {
                if let Some(path) = resolver.resolve(container_id) {
                    if !cgroup_paths.contains(&path) {
                        cgroup_paths.push(path);
                    }
                }
            }

            let index = workloads.len();
            for path in &cgroup_paths {
                match by_cgroup_path.entry(path.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                    Entry::Occupied(slot) => {
                        // First-listed workload keeps the path
                        collisions += 1;
                        let first: &WorkloadIdentity = &workloads[*slot.get()];
                        warn!(
                            "cgroup path {} claimed by both {}/{} and {}/{}, keeping first-seen mapping",
                            path, first.namespace, first.name, row.namespace, row.name
                        );
                    }
                }
            }

            workloads.push(WorkloadIdentity {
                name: row.name,
                namespace: row.namespace,
                node_name: row.node_name,
                container_ids: row.container_ids,
                cgroup_paths,
            });
        }

        Self {
            workloads,
            by_cgroup_path,
            collisions,
        }
    }
}

/// Holds the current workload snapshot and serves cgroup-path lookups
pub struct WorkloadRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    refresh_timeout: Duration,
}

impl WorkloadRegistry {
    /// Create an empty registry with the default refresh timeout
    pub fn new() -> Self {
        Self::with_refresh_timeout(DEFAULT_REFRESH_TIMEOUT)
    }

    pub fn with_refresh_timeout(refresh_timeout: Duration) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::default())),
            refresh_timeout,
        }
    }

    /// Replace the current snapshot from a fresh workload listing
    ///
    /// The new snapshot is built entirely before the swap, so concurrent
    /// lookups never observe a half-built generation. On listing failure or
    /// timeout the previous snapshot remains authoritative.
    pub async fn refresh(
        &self,
        lister: &dyn WorkloadLister,
        resolver: &dyn CgroupPathResolver,
    ) -> Result<(), RegistryError> {
        let listing = tokio::time::timeout(self.refresh_timeout, lister.list_workloads())
            .await
            .map_err(|_| RegistryError::Timeout {
                timeout: self.refresh_timeout,
            })??;

        let next = Arc::new(RegistrySnapshot::build(listing, resolver));
        debug!(
            "registry refreshed: {} workloads, {} cgroup paths, {} collisions",
            next.workloads.len(),
            next.by_cgroup_path.len(),
            next.collisions
        );

        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
        Ok(())
    }

    /// Look up the workload that owns a cgroup path
    ///
    /// Single hash probe against the current snapshot's index; an unknown
    /// path is an expected outcome, not an error.
    pub fn lookup(&self, cgroup_path: &str) -> Option<WorkloadIdentity> {
        let snapshot = self.current();
        snapshot
            .by_cgroup_path
            .get(cgroup_path)
            .map(|&index| snapshot.workloads[index].clone())
    }

    /// Number of workloads in the current snapshot
    pub fn workload_count(&self) -> usize {
        self.current().workloads.len()
    }

    /// Number of cgroup-path collisions recorded during the last refresh
    pub fn collision_count(&self) -> usize {
        self.current().collisions
    }

    fn current(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for WorkloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
