//! Traffic simulator
//!
//! Emulates live traffic by nudging agent counters once per tick. A tick is a
//! plain synchronous step over the store, so it can be driven by the fleet
//! actor's interval in production and single-stepped with a seeded RNG in tests.
//!
//! ## Per-agent step
//!
//! ```text
//! requests_today += U[0, 10)          (activity when > 0 → touch last_activity)
//! with p_err: error_rate += U[-0.005, 0.005), clamped to [0, 1]
//! with p_lat: response_time += U[-50, 50) ms, floored at 50 ms
//! ```
//!
//! The three draws are independent of each other and made afresh for every
//! agent on every tick. Alerts and policies are never touched.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{trace, warn};

use crate::{Agent, config::SimulationConfig, store::FleetStore};

/// Exclusive upper bound of the per-tick request increment
pub const MAX_REQUEST_INCREMENT: u64 = 10;

/// Half-width of the error-rate adjustment
pub const ERROR_RATE_JITTER: f64 = 0.005;

/// Half-width of the response-time adjustment in milliseconds
pub const RESPONSE_TIME_JITTER_MS: i64 = 50;

/// Response time never drops below this after an adjustment
pub const MIN_RESPONSE_TIME_MS: u64 = 50;

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Agents whose new values were committed
    pub updated: usize,

    /// Agents that saw at least one request this tick
    pub active: usize,

    /// Agents left untouched because their update failed
    pub skipped: Vec<String>,
}

/// Invariant violation found while stepping an agent
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    NonFiniteErrorRate { agent_id: String, value: f64 },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::NonFiniteErrorRate { agent_id, value } => {
                write!(f, "agent {} has non-finite error rate {}", agent_id, value)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

pub struct Simulator<R = StdRng> {
    rng: R,
    error_probability: f64,
    latency_probability: f64,
}

impl Simulator<StdRng> {
    /// Simulator seeded from OS entropy
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible simulator for tests
    pub fn seeded(config: &SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulator<R> {
    pub fn with_rng(config: &SimulationConfig, rng: R) -> Self {
        Self {
            rng,
            error_probability: probability(config.error_jitter_probability),
            latency_probability: probability(config.latency_jitter_probability),
        }
    }

    /// Run one step over every agent in the store.
    ///
    /// A failing agent is logged and skipped; the others are still updated.
    pub fn tick(&mut self, store: &mut FleetStore, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for agent in store.agents_mut() {
            match self.step(agent, now) {
                Ok((next, active)) => {
                    *agent = next;
                    report.updated += 1;
                    if active {
                        report.active += 1;
                    }
                }
                Err(e) => {
                    warn!(agent = %agent.id, "skipping agent in simulation tick: {e}");
                    report.skipped.push(agent.id.clone());
                }
            }
        }

        trace!(
            updated = report.updated,
            active = report.active,
            skipped = report.skipped.len(),
            "simulation tick complete"
        );

        report
    }

    /// Compute the next state of one agent without touching the stored copy.
    fn step(
        &mut self,
        agent: &Agent,
        now: DateTime<Utc>,
    ) -> Result<(Agent, bool), SimulationError> {
        if !agent.error_rate.is_finite() {
            return Err(SimulationError::NonFiniteErrorRate {
                agent_id: agent.id.clone(),
                value: agent.error_rate,
            });
        }

        let mut next = agent.clone();

        let increment = self.rng.gen_range(0..MAX_REQUEST_INCREMENT);
        next.requests_today = next.requests_today.saturating_add(increment);
        let active = increment > 0;
        if active {
            next.metrics.total_requests = next.metrics.total_requests.saturating_add(increment);
            next.touch(now);
        }

        if self.rng.gen_bool(self.error_probability) {
            next.error_rate += self.rng.gen_range(-ERROR_RATE_JITTER..ERROR_RATE_JITTER);
        }
        next.error_rate = next.error_rate.clamp(0.0, 1.0);

        if self.rng.gen_bool(self.latency_probability) {
            let delta = self
                .rng
                .gen_range(-RESPONSE_TIME_JITTER_MS..RESPONSE_TIME_JITTER_MS);
            let adjusted = i64::try_from(next.response_time)
                .unwrap_or(i64::MAX)
                .saturating_add(delta);
            next.response_time = u64::try_from(adjusted)
                .unwrap_or(0)
                .max(MIN_RESPONSE_TIME_MS);
        }

        Ok((next, active))
    }
}

/// `gen_bool` panics outside [0, 1], so anything else is treated as "never".
fn probability(p: f64) -> f64 {
    if (0.0..=1.0).contains(&p) { p } else { 0.0 }
}
