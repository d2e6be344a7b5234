//! Authoritative in-memory fleet state
//!
//! The store holds every agent (with its policies) and every alert the hub knows
//! about. It has no interior mutability: exactly one owner (the fleet actor)
//! holds it, so all writes are serialized through that owner's mailbox.
//!
//! ## Guarantees
//!
//! - Reads hand out clones, never references into the store
//! - Ids are unique per collection for the life of the store
//! - Alerts never go back to unacknowledged
//! - Agent last-activity never moves backwards
//!
//! Nothing is persisted; a new process starts again from the seed.

pub mod error;
pub mod overview;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{Agent, AgentStatus, Alert, NewPolicy, Policy, seed};

pub use error::{FleetError, FleetResult};
pub use overview::FleetOverview;

/// In-memory registry of agents, policies and alerts
#[derive(Debug, Clone)]
pub struct FleetStore {
    agents: Vec<Agent>,
    alerts: Vec<Alert>,

    /// Numeric suffix for the next server-assigned policy id (`p<n>`)
    next_policy_seq: u64,
}

impl FleetStore {
    /// Build a store from an initial fleet. Duplicate ids are rejected.
    pub fn new(agents: Vec<Agent>, alerts: Vec<Alert>) -> FleetResult<Self> {
        ensure_unique("agent", agents.iter().map(|agent| agent.id.as_str()))?;
        ensure_unique("alert", alerts.iter().map(|alert| alert.id.as_str()))?;
        ensure_unique(
            "policy",
            agents
                .iter()
                .flat_map(|agent| agent.policies.iter().map(|policy| policy.id.as_str())),
        )?;

        let next_policy_seq = agents
            .iter()
            .flat_map(|agent| agent.policies.iter())
            .filter_map(|policy| policy.id.strip_prefix('p')?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self {
            agents,
            alerts,
            next_policy_seq,
        })
    }

    /// Store populated with the fixed seed fleet
    pub fn seeded(now: DateTime<Utc>) -> FleetResult<Self> {
        Self::new(seed::agents(now), seed::alerts(now))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains_agent(&self, id: &str) -> bool {
        self.agents.iter().any(|agent| agent.id == id)
    }

    pub fn get_all(&self) -> Vec<Agent> {
        self.agents.clone()
    }

    pub fn get_by_id(&self, id: &str) -> FleetResult<Agent> {
        self.agents
            .iter()
            .find(|agent| agent.id == id)
            .cloned()
            .ok_or_else(|| FleetError::AgentNotFound(id.to_string()))
    }

    pub fn get_alerts(&self) -> Vec<Alert> {
        self.alerts.clone()
    }

    pub fn get_alert_by_id(&self, id: &str) -> FleetResult<Alert> {
        self.alerts
            .iter()
            .find(|alert| alert.id == id)
            .cloned()
            .ok_or_else(|| FleetError::AlertNotFound(id.to_string()))
    }

    pub fn set_agent_status(
        &mut self,
        id: &str,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> FleetResult<Agent> {
        let agent = self.agent_mut(id)?;
        debug!(agent = %id, from = %agent.status, to = %status, "changing agent status");

        agent.status = status;
        agent.touch(now);

        Ok(agent.clone())
    }

    /// Acknowledging an already acknowledged alert succeeds without changing it.
    pub fn acknowledge_alert(&mut self, id: &str, now: DateTime<Utc>) -> FleetResult<Alert> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or_else(|| FleetError::AlertNotFound(id.to_string()))?;

        alert.acknowledge(now);

        Ok(alert.clone())
    }

    /// Append a policy to an agent, assigning the next free `p<n>` id.
    ///
    /// The new policy is always the last entry of the returned agent's policies.
    pub fn add_policy(
        &mut self,
        agent_id: &str,
        policy: NewPolicy,
        now: DateTime<Utc>,
    ) -> FleetResult<Agent> {
        let name = policy.name.trim().to_string();
        if name.is_empty() {
            // Still report unknown agents first
            self.agent_mut(agent_id)?;
            return Err(FleetError::InvalidInput(
                "policy name is required".to_string(),
            ));
        }

        let id = format!("p{}", self.next_policy_seq);
        let agent = self.agent_mut(agent_id)?;

        debug!(agent = %agent_id, policy = %id, "adding policy");

        agent.policies.push(Policy {
            id,
            name,
            kind: policy.kind,
            enabled: policy.enabled,
            configuration: policy.configuration,
            last_updated: now,
        });
        let agent = agent.clone();

        self.next_policy_seq += 1;

        Ok(agent)
    }

    pub fn set_policy_enabled(
        &mut self,
        agent_id: &str,
        policy_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> FleetResult<Agent> {
        let agent = self.agent_mut(agent_id)?;

        let policy = agent
            .policies
            .iter_mut()
            .find(|policy| policy.id == policy_id)
            .ok_or_else(|| FleetError::PolicyNotFound {
                agent_id: agent_id.to_string(),
                policy_id: policy_id.to_string(),
            })?;

        debug!(agent = %agent_id, policy = %policy_id, enabled, "toggling policy");

        policy.enabled = enabled;
        policy.last_updated = now;

        Ok(agent.clone())
    }

    pub fn overview(&self, now: DateTime<Utc>) -> FleetOverview {
        FleetOverview::compute(&self.agents, &self.alerts, now)
    }

    /// Mutable access for the simulator, which only ever touches agent metrics.
    pub(crate) fn agents_mut(&mut self) -> std::slice::IterMut<'_, Agent> {
        self.agents.iter_mut()
    }

    fn agent_mut(&mut self, id: &str) -> FleetResult<&mut Agent> {
        self.agents
            .iter_mut()
            .find(|agent| agent.id == id)
            .ok_or_else(|| FleetError::AgentNotFound(id.to_string()))
    }
}

fn ensure_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> FleetResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(FleetError::InvalidInput(format!("duplicate {kind} id '{id}'")));
        }
    }
    Ok(())
}
