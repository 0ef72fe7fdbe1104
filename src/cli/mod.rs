use clap::Parser;

#[derive(Parser)]
#[command(name = "kubepulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Correlates kernel process telemetry with Kubernetes workloads and aggregates pod/lease heartbeats", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        long,
        default_value = "kube-node-lease",
        help = "Namespace holding node Lease objects"
    )]
    pub lease_namespace: String,

    #[arg(
        long,
        default_value_t = 60,
        help = "Seconds between workload registry refreshes"
    )]
    pub refresh_interval: u64,

    #[arg(
        long,
        default_value = "/sys/fs/cgroup/kubepods",
        help = "Prefix used to construct cgroup paths from container ids"
    )]
    pub cgroup_prefix: String,
}
