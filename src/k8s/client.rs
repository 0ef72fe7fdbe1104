use crate::{Error, Result};
use k8s_openapi::api::coordination::v1::Lease;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{Api, Client};
use tracing::{debug, info};

/// Thin wrapper over the kube client exposing the APIs this crate watches
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    pub async fn try_default() -> Result<Self> {
        debug!("Initializing Kubernetes client");

        let client = Client::try_default()
            .await
            .map_err(|e| Error::Kubernetes(format!("Failed to create K8s client: {}", e)))?;

        info!("Successfully connected to Kubernetes cluster");

        Ok(Self { client })
    }

    /// Pods across all namespaces
    pub fn pods_all(&self) -> Api<Pod> {
        Api::all(self.client.clone())
    }

    /// Leases in the given namespace (node leases live in `kube-node-lease`)
    pub fn leases(&self, namespace: &str) -> Api<Lease> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Names of every node in the cluster
    pub async fn list_nodes(&self) -> Result<Vec<String>> {
        let nodes: Api<Node> = Api::all(self.client.clone());

        let node_list = nodes
            .list(&Default::default())
            .await
            .map_err(|e| Error::Kubernetes(format!("Failed to list nodes: {}", e)))?;

        Ok(node_list
            .items
            .into_iter()
            .filter_map(|node| node.metadata.name)
            .collect())
    }
}
