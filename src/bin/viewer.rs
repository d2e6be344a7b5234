//! Headless fleet viewer
//!
//! Loads a snapshot over REST, then follows the hub's push channel and prints
//! a fleet summary whenever fresh metrics arrive. Logs go to a file so stdout
//! stays readable.

use std::{path::PathBuf, sync::Arc};

use agentwatch::{
    events::{Envelope, EventKind, FleetEvent},
    viewer::{
        ApiClient, ConnectionManager, FleetView, ViewerConfig, WsConnector,
        state::{subscribe_all, track_connection},
    },
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "agentwatch-viewer")]
#[command(about = "Follow a fleet hub from the terminal", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hub URL (overrides config file)
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,
}

fn init_logging(debug: bool) {
    let log_path = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("agentwatch")
        .join("viewer.log");

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match log_file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_level(true)
                .with_max_level(level)
                .with_writer(file)
                .init();
        }
        Err(_) => {
            // If we can't create a log file, use a minimal stderr logger that only shows errors
            tracing_subscriber::fmt()
                .with_target(false)
                .with_level(true)
                .with_max_level(tracing::Level::ERROR)
                .init();
        }
    }
}

fn print_summary(view: &FleetView) {
    let summary = view.summary();
    println!(
        "[{}] agents {}/{} active | requests {} | avg error {:.2}% | cost ${:.2} | open alerts {}",
        summary.timestamp.format("%H:%M:%S"),
        summary.active_agents,
        summary.total_agents,
        summary.total_requests,
        summary.avg_error_rate * 100.0,
        summary.total_cost,
        summary.unacknowledged_alerts,
    );
}

fn print_change(envelope: &Envelope) {
    match &envelope.event {
        FleetEvent::AgentStatusChanged(change) => {
            println!("agent {} is now {}", change.agent_id, change.status);
        }
        FleetEvent::AlertAcknowledged(ack) => println!("alert {} acknowledged", ack.alert_id),
        FleetEvent::PolicyUpdated(change) => println!(
            "policy {} on agent {} {}",
            change.policy.id,
            change.agent_id,
            if change.policy.enabled { "enabled" } else { "disabled" }
        ),
        FleetEvent::Connected(_) | FleetEvent::MetricsUpdated(_) => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ViewerConfig::load(args.config.as_deref())?;
    let config = ViewerConfig {
        api_url: args.url.unwrap_or(config.api_url),
        ..config
    };

    init_logging(config.debug);
    info!("viewer starting against {}", config.api_url);

    let client = ApiClient::new(&config.api_url, config.request_timeout())?;
    let (agents, alerts) = tokio::try_join!(client.agents(), client.alerts())
        .context("Failed to load initial fleet snapshot")?;

    let view = FleetView::new(agents, alerts).shared();
    print_summary(&view.lock());

    let manager = ConnectionManager::spawn(
        WsConnector::new(&config.api_url).with_connect_timeout(config.request_timeout()),
        config.reconnect_delay(),
    );

    // The view must see each envelope before the printers below
    subscribe_all(&view, manager.bus());
    {
        let view = Arc::clone(&view);
        manager.subscribe(EventKind::MetricsUpdated, move |_| {
            print_summary(&view.lock());
        });
    }
    for kind in [
        EventKind::AgentStatusChanged,
        EventKind::AlertAcknowledged,
        EventKind::PolicyUpdated,
    ] {
        manager.subscribe(kind, print_change);
    }

    // Catch up on anything missed while the channel was down
    track_connection(Arc::clone(&view), client, manager.watch_state());

    let mut state_rx = manager.watch_state();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            println!("push channel: {state:?}");
        }
    });

    manager.connect()?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    manager.disconnect()?;
    manager.shutdown()?;

    Ok(())
}
