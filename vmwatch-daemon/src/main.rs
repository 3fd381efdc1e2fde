use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use vmwatch_core::observability::health::HYPERVISOR_SUBSYSTEM;
use vmwatch_core::{
    init_observability, shutdown_observability, Config, HealthChecker, HypervisorFactory,
    InventoryStore, Reconciler, Scheduler,
};

mod shutdown;

/// Keeps an in-memory inventory of the VMs on this host in sync with the hypervisor.
#[derive(Parser, Debug)]
#[command(name = "vmwatchd", version, about)]
struct Args {
    /// Path to config.json (defaults to the vmwatch config directory)
    #[arg(long, env = "VMWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Hypervisor connection URI, overrides the config file
    #[arg(long, env = "VMWATCH_HYPERVISOR_URI")]
    uri: Option<String>,

    /// Seconds between reconciliation cycles, overrides the config file
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Run a single reconciliation cycle, print VM statuses as JSON and exit
    #[arg(long)]
    once: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(uri) = &args.uri {
        config.hypervisor_uri = uri.clone();
    }
    if let Some(secs) = args.interval_secs {
        config.reconcile_interval_secs = secs;
    }
    if args.once {
        config.metrics_enabled = false;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("Failed to load configuration")?;

    // Initialize observability FIRST
    init_observability(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize observability: {}", e))?;

    info!(uri = %config.hypervisor_uri, "vmwatch daemon starting");

    let health = HealthChecker::new();
    health.register_subsystem("daemon").await;

    let hypervisor = match HypervisorFactory::create(&config) {
        Ok(hypervisor) => hypervisor,
        Err(e) => {
            error!(error = %e, "Failed to create hypervisor backend");
            shutdown_observability();
            return Err(e.into());
        }
    };

    let store = InventoryStore::new();
    let reconciler = Arc::new(
        Reconciler::new(hypervisor, store.clone())
            .with_call_timeout(config.call_timeout())
            .with_health(health.clone()),
    );

    if args.once {
        let result = reconciler.reconcile().await;
        shutdown_observability();
        result?;
        println!("{}", serde_json::to_string_pretty(&store.statuses().await)?);
        return Ok(());
    }

    health.register_subsystem(HYPERVISOR_SUBSYSTEM).await;
    let scheduler = Scheduler::new(reconciler, config.reconcile_interval()).spawn();
    info!(interval_secs = config.reconcile_interval_secs, "vmwatch daemon ready");

    let mut shutdown = shutdown::shutdown_signal();
    let _ = shutdown.recv().await;

    scheduler.abort();
    let _ = scheduler.await;

    info!(vms = store.len().await, "vmwatch daemon shutting down");
    shutdown_observability();
    Ok(())
}
