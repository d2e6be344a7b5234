//! Helper functions for integration tests

use std::{net::SocketAddr, time::Duration};

use agentwatch::{
    actors::fleet::FleetHandle,
    api::{ApiConfig, ApiState, spawn_api_server},
    broadcast::Broadcaster,
    config::SimulationConfig,
    simulator::Simulator,
    store::FleetStore,
};
use chrono::Utc;

/// A hub bound to a random local port
pub struct TestHub {
    pub addr: SocketAddr,
    pub fleet: FleetHandle,
    pub broadcaster: Broadcaster,
}

impl TestHub {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

/// Seeded hub with the ticker disabled; tests step it with `tick_now`
pub async fn spawn_hub() -> TestHub {
    spawn_hub_with_ticker(None).await
}

pub async fn spawn_hub_with_ticker(tick_interval: Option<Duration>) -> TestHub {
    let broadcaster = Broadcaster::default();
    let fleet = FleetHandle::spawn(
        FleetStore::seeded(Utc::now()).unwrap(),
        Simulator::seeded(&SimulationConfig::default(), 2024),
        broadcaster.clone(),
        tick_interval,
    );

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    let addr = spawn_api_server(config, ApiState::new(fleet.clone(), broadcaster.clone()))
        .await
        .unwrap();

    TestHub {
        addr,
        fleet,
        broadcaster,
    }
}
