//! Identity Agent - Standalone Binary
//!
//! Reconciles module identities once for a desired/current module set pair
//! and prints the resulting module identities as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use edge_identity_engine::module_identity::{
    load_module_set, EdgeletIdentityClient, ModuleConnectionStringBuilder,
    ModuleIdentityReconciler, ModuleSet, ReconcilerConfig, DEFAULT_API_VERSION, EDGE_MANAGED_BY,
};

/// Identity Agent - Syncs module identities with the edge security daemon
#[derive(Parser, Debug)]
#[command(name = "identity-agent", version, about)]
struct Args {
    /// IoT hub host name used in connection strings
    #[arg(long, env = "IOTEDGE_IOTHUBHOSTNAME")]
    iothub_hostname: String,

    /// Device ID used in connection strings
    #[arg(long, env = "IOTEDGE_DEVICEID")]
    device_id: String,

    /// Gateway host name non-hub modules connect through
    #[arg(long, env = "IOTEDGE_GATEWAYHOSTNAME")]
    gateway_hostname: String,

    /// Management API base URI of the edge security daemon
    #[arg(long, default_value = "http://localhost:15580", env = "IOTEDGE_MANAGEMENTURI")]
    management_uri: String,

    /// Management API version
    #[arg(long, default_value = DEFAULT_API_VERSION, env = "IOTEDGE_APIVERSION")]
    api_version: String,

    /// Tag written on, and required for removal of, agent-owned identities
    #[arg(long, default_value = EDGE_MANAGED_BY)]
    managed_by: String,

    /// JSON file with the desired module set
    #[arg(long)]
    desired: PathBuf,

    /// JSON file with the current module set (empty when omitted)
    #[arg(long)]
    current: Option<PathBuf>,

    /// Reconciliation timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .json()
        .init();

    let args = Args::parse();

    info!(
        management_uri = %args.management_uri,
        device_id = %args.device_id,
        gateway = %args.gateway_hostname,
        "Starting Identity Agent"
    );

    let desired = load_module_set(&args.desired)?;
    let current = match &args.current {
        Some(path) => load_module_set(path)?,
        None => ModuleSet::empty(),
    };

    let config = ReconcilerConfig::new(&args.gateway_hostname).managed_by(&args.managed_by);
    let builder = ModuleConnectionStringBuilder::new(&args.iothub_hostname, &args.device_id)?;
    let store = Arc::new(EdgeletIdentityClient::new(&args.management_uri, &args.api_version)?);
    let reconciler = ModuleIdentityReconciler::new(store, builder, &config)?;

    let outcome = tokio::time::timeout(
        Duration::from_secs(args.timeout),
        reconciler.reconcile(&desired, &current),
    )
    .await
    .context("Reconciliation timed out")?;

    let identities = match outcome {
        Ok(identities) => identities,
        Err(e) => {
            error!(error = %e, "Reconciliation failed");
            return Err(e.into());
        }
    };

    for name in identities.names() {
        info!(module = %name, "Module identity ready");
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&identities).context("Failed to serialize identities")?
    );

    Ok(())
}
