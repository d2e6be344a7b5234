//! Fleet-wide rollup served by `GET /api/metrics/overview`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Agent, AgentStatus, Alert};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetOverview {
    pub total_agents: usize,
    pub active_agents: usize,
    pub total_requests: u64,
    /// Mean error rate across agents, 0 for an empty fleet
    pub avg_error_rate: f64,
    pub total_cost: f64,
    pub unacknowledged_alerts: usize,
    pub timestamp: DateTime<Utc>,
}

impl FleetOverview {
    /// Derive the overview from a snapshot. Pure: the same inputs always give
    /// the same numbers.
    pub fn compute(agents: &[Agent], alerts: &[Alert], timestamp: DateTime<Utc>) -> Self {
        let total_agents = agents.len();

        let avg_error_rate = if total_agents == 0 {
            0.0
        } else {
            agents.iter().map(|agent| agent.error_rate).sum::<f64>() / total_agents as f64
        };

        Self {
            total_agents,
            active_agents: agents
                .iter()
                .filter(|agent| agent.status == AgentStatus::Active)
                .count(),
            total_requests: agents.iter().map(|agent| agent.requests_today).sum(),
            avg_error_rate,
            total_cost: agents.iter().map(|agent| agent.metrics.cost_today).sum(),
            unacknowledged_alerts: alerts.iter().filter(|alert| !alert.acknowledged).count(),
            timestamp,
        }
    }
}
