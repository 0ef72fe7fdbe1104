use anyhow::{Context, Result};
use clap::Parser;
use kubepulse::cli::Cli;
use kubepulse::k8s::{ClusterWorkloadLister, K8sClient};
use kubepulse::registry::{TemplateResolver, WorkloadRegistry};
use kubepulse::store::HeartbeatStore;
use kubepulse::watch::{SubscriptionOutcome, WatchDispatcher};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting kubepulse v{}", kubepulse::VERSION);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = K8sClient::try_default()
        .await
        .context("Kubernetes client initialization failed")?;

    let nodes = client.list_nodes().await?;
    info!("Cluster has {} nodes", nodes.len());

    let registry = Arc::new(WorkloadRegistry::new());
    let lister = ClusterWorkloadLister::new(client.pods_all());
    let resolver = TemplateResolver::new(&cli.cgroup_prefix);

    match registry.refresh(&lister, &resolver).await {
        Ok(()) => info!("Tracking {} workloads", registry.workload_count()),
        Err(e) => warn!("Initial registry refresh failed, starting empty: {}", e),
    }

    let store = HeartbeatStore::new();
    let shutdown = CancellationToken::new();

    let dispatcher = WatchDispatcher::new(
        &client,
        &cli.lease_namespace,
        store.clone(),
        shutdown.clone(),
    );
    let subscriptions = dispatcher.spawn();

    // Periodic refresh keeps the cgroup index current as pods churn
    let refresher = {
        let registry = registry.clone();
        let shutdown = shutdown.clone();
        let interval = Duration::from_secs(cli.refresh_interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // initial refresh already done above
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = registry.refresh(&lister, &resolver).await {
                            warn!("Registry refresh failed, keeping previous snapshot: {}", e);
                        }
                    }
                }
            }
        })
    };

    info!("kubepulse running. Press Ctrl+C to exit.");
    signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;
    info!("Shutdown signal received");
    shutdown.cancel();

    for (kind, handle) in subscriptions {
        match handle.await {
            Ok(SubscriptionOutcome::Closed) => info!("{} subscription closed", kind),
            Ok(SubscriptionOutcome::Failed(e)) => warn!("{} subscription failed: {}", kind, e),
            Err(e) => warn!("{} subscription task panicked: {}", kind, e),
        }
    }
    let _ = refresher.await;

    info!("Collected {} heartbeat records this run", store.len());
    Ok(())
}
