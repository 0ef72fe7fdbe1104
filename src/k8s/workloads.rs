//! Workload listing backed by the Kubernetes API
//!
//! Turns the cluster's pod list into the raw rows the registry indexes:
//! name, namespace, node assignment, and the container ids reported by the
//! runtime (with the `containerd://`-style prefix stripped).

use crate::error::RegistryError;
use crate::registry::{WorkloadLister, WorkloadListing};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;

/// `WorkloadLister` implementation over the cluster-wide pod API
pub struct ClusterWorkloadLister {
    api: Api<Pod>,
}

impl ClusterWorkloadLister {
    pub fn new(api: Api<Pod>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl WorkloadLister for ClusterWorkloadLister {
    async fn list_workloads(&self) -> Result<Vec<WorkloadListing>, RegistryError> {
        let pods = self
            .api
            .list(&Default::default())
            .await
            .map_err(|e| RegistryError::Listing(e.to_string()))?;

        Ok(pods.items.iter().map(listing_from_pod).collect())
    }
}

/// Extract the registry row for a single pod
fn listing_from_pod(pod: &Pod) -> WorkloadListing {
    let container_ids = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| {
            statuses
                .iter()
                .filter_map(|cs| cs.container_id.as_deref())
                .map(strip_runtime_prefix)
                .collect()
        })
        .unwrap_or_default();

    WorkloadListing {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        node_name: pod
            .spec
            .as_ref()
            .and_then(|s| s.node_name.clone())
            .unwrap_or_default(),
        container_ids,
    }
}

/// Strip the runtime scheme from a container id ("containerd://abc" -> "abc")
fn strip_runtime_prefix(container_id: &str) -> String {
    container_id
        .split("://")
        .last()
        .unwrap_or(container_id)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ContainerStatus, PodSpec, PodStatus};

    #[test]
    fn test_strip_runtime_prefix() {
        assert_eq!(strip_runtime_prefix("containerd://abc123"), "abc123");
        assert_eq!(strip_runtime_prefix("docker://def456"), "def456");
        assert_eq!(strip_runtime_prefix("bare-id"), "bare-id");
    }

    #[test]
    fn test_listing_from_pod() {
        let mut pod = Pod::default();
        pod.metadata.name = Some("demo-pod".to_string());
        pod.metadata.namespace = Some("default".to_string());
        pod.spec = Some(PodSpec {
            node_name: Some("node-01".to_string()),
            ..Default::default()
        });
        pod.status = Some(PodStatus {
            container_statuses: Some(vec![
                ContainerStatus {
                    name: "app".to_string(),
                    container_id: Some("containerd://abc123".to_string()),
                    ..Default::default()
                },
                // Containers that have not started yet carry no id
                ContainerStatus {
                    name: "sidecar".to_string(),
                    container_id: None,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        });

        let listing = listing_from_pod(&pod);
        assert_eq!(listing.name, "demo-pod");
        assert_eq!(listing.namespace, "default");
        assert_eq!(listing.node_name, "node-01");
        assert_eq!(listing.container_ids, vec!["abc123".to_string()]);
    }

    #[test]
    fn test_listing_from_pod_without_status() {
        let mut pod = Pod::default();
        pod.metadata.name = Some("pending".to_string());

        let listing = listing_from_pod(&pod);
        assert_eq!(listing.name, "pending");
        assert!(listing.container_ids.is_empty());
        assert!(listing.node_name.is_empty());
    }
}
