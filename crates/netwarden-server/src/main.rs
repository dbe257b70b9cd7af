//! CLI entry point for the NetWarden daemon.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::{watch, Semaphore};
use tracing_subscriber::{fmt, EnvFilter};

use netwarden_core::config::WardenConfig;
use netwarden_discover::pipeline::DiscoveryPipeline;
use netwarden_discover::registry::DeviceRegistry;
use netwarden_discover::scheduler::MonitorScheduler;
use netwarden_store::AllowlistStore;

use netwarden_server::context::ServerContext;
use netwarden_server::{listener, tls};

#[derive(Parser)]
#[command(name = "netwardend")]
#[command(about = "LAN device monitor with an allowlist command server")]
struct Cli {
    /// Config file prefix (default: netwarden).
    #[arg(short, long, default_value = "netwarden")]
    config: String,

    /// Override the plain TCP listener port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Run a single discovery cycle, print the device table, and exit.
    #[arg(long)]
    once: bool,

    /// Run as the full daemon (monitor loop + command listeners).
    #[arg(long)]
    daemon: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    if cli.once && cli.daemon {
        anyhow::bail!("--once and --daemon are mutually exclusive");
    }

    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    let (store, summary) = AllowlistStore::open(config.allowlist.path.as_str())?;
    tracing::info!(
        path = %config.allowlist.path,
        loaded = summary.loaded,
        skipped_malformed = summary.skipped_malformed,
        skipped_duplicate = summary.skipped_duplicate,
        "Allowlist loaded"
    );
    let store = Arc::new(store);

    let registry = Arc::new(DeviceRegistry::new(
        Arc::clone(&store),
        config.monitor.auto_add,
    ));
    let pipeline = Arc::new(DiscoveryPipeline::new(config.monitor.clone()));

    if cli.once {
        return run_once(&pipeline, &registry).await;
    }

    let scheduler = MonitorScheduler::new(
        config.monitor.clone(),
        Arc::clone(&pipeline),
        Arc::clone(&registry),
    );
    let monitor = scheduler.start();

    let context = Arc::new(ServerContext::new(
        config.clone(),
        Arc::clone(&store),
        Arc::clone(&registry),
    ));
    let clients = Arc::new(Semaphore::new(config.server.max_clients));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let tcp = listener::bind(&config.server.bind_addr, config.server.port).await?;
    tracing::info!(
        addr = %config.server.bind_addr,
        port = config.server.port,
        "Command listener ready"
    );
    let tcp_task = tokio::spawn(listener::run(
        tcp,
        Arc::clone(&clients),
        Arc::clone(&context),
        shutdown_rx.clone(),
    ));

    let tls_task = if config.tls.enabled {
        let acceptor = tls::build_acceptor(&config.tls.cert_path, &config.tls.key_path)?;
        let tls_listener = listener::bind(&config.server.bind_addr, config.tls.port).await?;
        tracing::info!(
            addr = %config.server.bind_addr,
            port = config.tls.port,
            "TLS listener ready"
        );
        Some(tokio::spawn(listener::run_tls(
            tls_listener,
            acceptor,
            Arc::clone(&clients),
            Arc::clone(&context),
            shutdown_rx.clone(),
        )))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    tcp_task.await?;
    if let Some(task) = tls_task {
        task.await?;
    }
    monitor.stop().await;

    tracing::info!("NetWarden stopped");
    Ok(())
}

/// One discovery cycle, table to stdout, no listeners.
async fn run_once(pipeline: &DiscoveryPipeline, registry: &DeviceRegistry) -> anyhow::Result<()> {
    let result = pipeline.run_cycle().await;
    for obs in &result.observations {
        registry.upsert(obs);
    }

    let devices = registry.all();
    println!(
        "{} device(s) discovered in {} ms",
        devices.len(),
        result.duration.as_millis()
    );
    println!("{:<17} {:<15} {:<24} KNOWN", "MAC", "IP", "HOSTNAME");
    for device in devices {
        println!(
            "{:<17} {:<15} {:<24} {}",
            device.mac.to_string(),
            device.ip.map(|ip| ip.to_string()).unwrap_or_default(),
            device.hostname,
            device.known,
        );
    }
    Ok(())
}

fn load_config(file_prefix: &str) -> anyhow::Result<WardenConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("NETWARDEN")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(cfg.try_deserialize()?)
}
