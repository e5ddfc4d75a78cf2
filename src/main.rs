//! hadb: database health checks for HAProxy-style TCP load balancers.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                     HADB                         │
//!   Load balancer      │  ┌──────────┐   ┌────────────┐   ┌────────────┐ │
//!   "GET db1 ..."  ────┼─▶│ listener │──▶│ worker 0..N│──▶│ dispatcher │ │
//!                      │  └──────────┘   └────────────┘   └─────┬──────┘ │
//!                      │                                        │        │
//!                      │        ┌───────────────┬───────────────┤        │
//!                      │        ▼               ▼               ▼        │
//!                      │  ┌──────────┐   ┌────────────┐   ┌───────────┐ │    Database
//!                      │  │  status  │◀─▶│   state    │   │   probe   │─┼──▶ (pg/mysql/tcp)
//!                      │  │  store   │   │  machine   │   └───────────┘ │
//!                      │  └──────────┘   └─────┬──────┘                 │
//!   "HTTP/1.1 503" ◀───┼───────────────────────┤                        │
//!                      │                       ▼ (edge into DEAD)       │
//!                      │               ┌──────────────┐                 │
//!                      │               │ remediation  │── sh -c stonith/failover
//!                      │               └──────────────┘                 │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use hadb::config::{self, HadbConfig};
use hadb::health::{DbProber, StatusRecord, StatusStore};
use hadb::lifecycle::{signals, Supervisor};
use hadb::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "hadb")]
#[command(about = "Database health checks for TCP load balancers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the health-check daemon (default)
    Run,
    /// Print every target's status record as JSON
    Status,
    /// Mark a target UP again after manual recovery
    Reset {
        /// Target identifier from the config file
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Status => status(&config).await,
        Commands::Reset { target } => reset(&config, &target).await,
    }
}

async fn run(config: HadbConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&config.observability)?;

    tracing::info!("hadb v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address(),
        workers = config.server.children,
        targets = config.targets.len(),
        dead_limit = config.server.dead_limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let prober = DbProber::new(config.server.probe_timeout_secs.map(Duration::from_secs));
    let mut supervisor = Supervisor::start(Arc::new(config), prober)?;

    let waited = signals::wait_for_termination().await;
    supervisor.shutdown();
    waited?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn status(config: &HadbConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = StatusStore::new(&config.server.status_dir);
    let mut report = serde_json::Map::new();
    for id in config.targets.keys() {
        let record = store.load(id).await?;
        report.insert(id.clone(), serde_json::to_value(record)?);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn reset(config: &HadbConfig, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    if config.target(target).is_none() {
        return Err(format!("unknown target `{target}`").into());
    }
    let store = StatusStore::new(&config.server.status_dir);
    store.write(target, &StatusRecord::up()).await?;
    println!("{target}: UP");
    Ok(())
}
