pub mod client;
pub mod workloads;

pub use client::K8sClient;
pub use workloads::ClusterWorkloadLister;
