//! RTE Inventory
//!
//! Polls the pod-resources provider chain of this node and prints the
//! per-container assignments and the allocatable capacity as JSON.
//!
//! # Provider chain
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌──────────────────────┐
//! │  Shared-Pool Filter  │ → │   Sysinfo Fallback   │ → │   Primary Provider   │
//! │      (always)        │   │      (always)        │   │ (snapshot / none)    │
//! └──────────────────────┘   └──────────────────────┘   └──────────────────────┘
//! ```

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rte_inventory::domain::podresources::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ListPodResourcesRequest,
    ListPodResourcesResponse,
};
use rte_inventory::config::DEFAULT_RESOURCES_CONFIG_PATH;
use rte_inventory::{
    ContainerIdent, ExporterConfig, HostProbeRef, PodResourcesProviderRef, ProviderChain,
    ResourcesConfig, Result, SnapshotProvider, SysInfo, SysfsProbe, UnavailableProvider,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// RTE Inventory - per-node NUMA resource inventory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sysfs root to probe (a host sysfs mounted into the container)
    #[arg(long, env = "SYSFS_ROOT", default_value = "/sys")]
    sysfs: PathBuf,

    /// Resource mapping configuration (JSON or YAML) for the sysinfo fallback
    #[arg(long, env = "RESOURCE_CONFIG", default_value = DEFAULT_RESOURCES_CONFIG_PATH)]
    resource_config: PathBuf,

    /// Exporter configuration (YAML)
    #[arg(long, env = "EXPORTER_CONFIG")]
    exporter_config: Option<PathBuf>,

    /// Shared pool reference container as namespace/podname/containername
    #[arg(long, env = "REFERENCE_CONTAINER")]
    reference_container: Option<String>,

    /// Pod resources snapshot file used as the primary provider
    #[arg(long, env = "PODRESOURCES_SNAPSHOT")]
    podresources_snapshot: Option<PathBuf>,

    /// Seconds between two polls
    #[arg(long, env = "SLEEP_INTERVAL", default_value = "60")]
    sleep_interval_secs: u64,

    /// Poll once and exit
    #[arg(long, env = "ONESHOT")]
    oneshot: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

/// One poll of the provider chain
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PollOutput {
    timestamp: chrono::DateTime<chrono::Utc>,
    pod_resources: Option<ListPodResourcesResponse>,
    allocatable: Option<AllocatableResourcesResponse>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting RTE Inventory");
    info!("  Version: {}", rte_inventory::VERSION);
    info!("  Resource config: {}", args.resource_config.display());
    info!("  Oneshot: {}", args.oneshot);

    let exporter_config = match &args.exporter_config {
        Some(path) => ExporterConfig::load(path)?,
        None => ExporterConfig::default(),
    };

    let resources_config = ResourcesConfig::resolve(&args.resource_config, &exporter_config)?;

    let reference = ContainerIdent::resolve(
        args.reference_container.as_deref(),
        exporter_config.reference_container.clone(),
    )?;

    let sysfs_probe = SysfsProbe::with_root(&args.sysfs);
    info!("Reading host sysfs from {}", sysfs_probe.root().display());
    let probe: HostProbeRef = Arc::new(sysfs_probe);
    log_system_information(resources_config.clone(), probe.clone()).await;

    let primary: PodResourcesProviderRef = match &args.podresources_snapshot {
        Some(path) => {
            let snapshot = SnapshotProvider::new(path);
            info!("Using pod resources snapshot {}", snapshot.path().display());
            Arc::new(snapshot)
        }
        None => {
            warn!("No pod resources endpoint configured");
            Arc::new(UnavailableProvider)
        }
    };

    let chain = ProviderChain::build(primary, Some((resources_config, probe)), reference);

    // Log shared pool transitions
    let mut events = chain.filter().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!("Filter event {}: {}", event.name(), json),
                Err(e) => warn!("Failed to encode filter event: {}", e),
            }
        }
    });

    let provider = chain.provider();
    if args.oneshot {
        return poll(&provider).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.sleep_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = poll(&provider).await {
                    error!("Poll failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("RTE Inventory shutdown complete");
    Ok(())
}

// =============================================================================
// Polling
// =============================================================================

async fn poll(provider: &PodResourcesProviderRef) -> Result<()> {
    let pod_resources = match provider.list(ListPodResourcesRequest::default()).await {
        Ok(resp) => Some(resp),
        Err(e) => {
            warn!(
                "{} List() failed: {} (retryable: {})",
                provider.provider_name(),
                e,
                e.is_retryable()
            );
            None
        }
    };

    let allocatable = match provider
        .get_allocatable_resources(AllocatableResourcesRequest::default())
        .await
    {
        Ok(resp) => Some(resp),
        Err(e) => {
            warn!(
                "{} GetAllocatableResources() failed: {} (retryable: {})",
                provider.provider_name(),
                e,
                e.is_retryable()
            );
            None
        }
    };

    let output = PollOutput {
        timestamp: chrono::Utc::now(),
        pod_resources,
        allocatable,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn log_system_information(config: ResourcesConfig, probe: HostProbeRef) {
    let built = tokio::task::spawn_blocking(move || SysInfo::build(&config, probe.as_ref())).await;
    match built {
        Ok(Ok(sysinfo)) => info!("System information:\n{}", sysinfo),
        Ok(Err(e)) => warn!("Failed to build system information: {}", e),
        Err(e) => warn!("System information task failed: {}", e),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init();
    }
}
