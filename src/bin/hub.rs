//! Fleet hub
//!
//! Seeds the in-memory fleet, runs the traffic simulator and serves the REST
//! API plus the `/ws` push channel until Ctrl-C.

use agentwatch::{
    actors::fleet::FleetHandle,
    api::{ApiConfig, ApiState, spawn_api_server},
    broadcast::Broadcaster,
    config::{HubConfig, read_config_file},
    simulator::Simulator,
    store::FleetStore,
};
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(name = "agentwatch-hub")]
#[command(about = "Real-time fleet monitoring hub", long_about = None)]
struct Args {
    /// Config file (JSON); defaults apply when omitted
    #[arg(short, long)]
    file: Option<String>,

    /// Log per-request and per-tick detail
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn init(args: &Args) {
    let level = if args.quiet {
        LevelFilter::WARN
    } else if args.verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };

    let filter = filter::Targets::new().with_targets(vec![
        ("agentwatch", level),
        ("agentwatch_hub", level),
        ("tower_http", level.min(LevelFilter::DEBUG)),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(&args);
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => HubConfig::default(),
    };

    let store = FleetStore::seeded(Utc::now()).context("Failed to seed fleet")?;
    info!(agents = store.len(), "fleet seeded");

    let broadcaster = Broadcaster::new(config.observer_buffer);
    let fleet = FleetHandle::spawn(
        store,
        Simulator::new(&config.simulation),
        broadcaster.clone(),
        config.simulation.tick_interval(),
    );

    let addr = spawn_api_server(
        ApiConfig::from(&config),
        ApiState::new(fleet.clone(), broadcaster),
    )
    .await?;
    info!("hub ready: REST on http://{addr}/api, push channel on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("shutting down");
    fleet.shutdown().await?;

    Ok(())
}
