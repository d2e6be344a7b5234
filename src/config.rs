use std::net::SocketAddr;
use std::time::Duration;

use tracing::trace;

use crate::broadcast::DEFAULT_OBSERVER_BUFFER;

/// Hub configuration, read from an optional JSON file
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HubConfig {
    /// Listen address. Falls back to `HUB_ADDR`/`PORT` from the environment.
    pub bind_addr: Option<SocketAddr>,

    /// Allow cross-origin requests from browser dashboards
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Envelopes buffered per observer before new ones are dropped
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: None,
            enable_cors: default_enable_cors(),
            observer_buffer: default_observer_buffer(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Traffic simulation parameters
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SimulationConfig {
    /// Tick period in milliseconds; 0 disables the ticker
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Per-agent, per-tick chance of an error-rate adjustment
    #[serde(default = "default_error_jitter_probability")]
    pub error_jitter_probability: f64,

    /// Per-agent, per-tick chance of a response-time adjustment
    #[serde(default = "default_latency_jitter_probability")]
    pub latency_jitter_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            error_jitter_probability: default_error_jitter_probability(),
            latency_jitter_probability: default_latency_jitter_probability(),
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Option<Duration> {
        (self.tick_interval_ms > 0).then(|| Duration::from_millis(self.tick_interval_ms))
    }
}

fn default_enable_cors() -> bool {
    true
}

fn default_observer_buffer() -> usize {
    DEFAULT_OBSERVER_BUFFER
}

fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_error_jitter_probability() -> f64 {
    0.10
}

fn default_latency_jitter_probability() -> f64 {
    0.05
}

impl HubConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            (
                "error_jitter_probability",
                self.simulation.error_jitter_probability,
            ),
            (
                "latency_jitter_probability",
                self.simulation.latency_jitter_probability,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be within [0, 1], got {value}");
            }
        }

        if self.observer_buffer == 0 {
            anyhow::bail!("observer_buffer must be at least 1");
        }

        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<HubConfig> {
    let file_content = std::fs::read_to_string(path)?;
    let config: HubConfig = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;

    config.validate()?;
    trace!("loaded config: {config:?}");

    Ok(config)
}
