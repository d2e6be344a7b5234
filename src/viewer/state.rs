//! Local copy of the fleet held by a viewer

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    Agent, Alert,
    events::{Envelope, EventKind, FleetEvent},
    store::FleetOverview,
};

use super::{
    bus::{EventBus, SubscriptionId},
    client::ApiClient,
    connection::ConnectionState,
};

pub type SharedFleetView = Arc<Mutex<FleetView>>;

/// Fleet state as last seen by this observer
#[derive(Debug, Clone, Default)]
pub struct FleetView {
    agents: Vec<Agent>,
    alerts: Vec<Alert>,
    connected: bool,
    last_update: Option<DateTime<Utc>>,
}

impl FleetView {
    /// Start from a REST snapshot
    pub fn new(agents: Vec<Agent>, alerts: Vec<Alert>) -> Self {
        Self {
            agents,
            alerts,
            connected: false,
            last_update: None,
        }
    }

    pub fn shared(self) -> SharedFleetView {
        Arc::new(Mutex::new(self))
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn alert(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn replace_agents(&mut self, agents: Vec<Agent>) {
        self.agents = agents;
    }

    /// Swap in a fresh alert list. Acknowledgements are write-once, so one
    /// this view already holds survives a snapshot taken before it.
    pub fn replace_alerts(&mut self, mut alerts: Vec<Alert>) {
        for alert in &mut alerts {
            if let Some(known) = self.alert(&alert.id) {
                if known.acknowledged && !alert.acknowledged {
                    alert.acknowledged = true;
                    alert.acknowledged_at = known.acknowledged_at;
                }
            }
        }
        self.alerts = alerts;
    }

    /// Timestamp of the last envelope that changed the view
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Rollup over the local copy, same arithmetic as the hub's overview
    pub fn summary(&self) -> FleetOverview {
        FleetOverview::compute(
            &self.agents,
            &self.alerts,
            self.last_update.unwrap_or_else(Utc::now),
        )
    }

    /// Apply one envelope. Returns whether anything changed.
    ///
    /// Envelopes naming agents, alerts or policies this view has never seen
    /// are ignored; the next `metrics_updated` brings the agent list back in
    /// line.
    pub fn apply(&mut self, envelope: &Envelope) -> bool {
        let changed = match &envelope.event {
            FleetEvent::Connected(_) => {
                self.connected = true;
                true
            }

            FleetEvent::MetricsUpdated(agents) => {
                self.agents = agents.clone();
                true
            }

            FleetEvent::AgentStatusChanged(change) => {
                match self.agents.iter_mut().find(|a| a.id == change.agent_id) {
                    Some(agent) => {
                        agent.status = change.status;
                        agent.touch(change.timestamp);
                        true
                    }
                    None => false,
                }
            }

            FleetEvent::AlertAcknowledged(ack) => {
                match self.alerts.iter_mut().find(|a| a.id == ack.alert_id) {
                    Some(alert) => {
                        alert.acknowledge(ack.timestamp);
                        true
                    }
                    None => false,
                }
            }

            FleetEvent::PolicyUpdated(change) => {
                match self.agents.iter_mut().find(|a| a.id == change.agent_id) {
                    Some(agent) => {
                        match agent.policies.iter_mut().find(|p| p.id == change.policy.id) {
                            Some(existing) => *existing = change.policy.clone(),
                            None => agent.policies.push(change.policy.clone()),
                        }
                        true
                    }
                    None => false,
                }
            }
        };

        if changed {
            self.last_update = Some(envelope.timestamp);
        }
        changed
    }
}

/// Keep `view` in sync with every envelope kind the bus carries
pub fn subscribe_all(view: &SharedFleetView, bus: &EventBus) -> Vec<(EventKind, SubscriptionId)> {
    EventKind::ALL
        .into_iter()
        .map(|kind| {
            let view = Arc::clone(view);
            let id = bus.subscribe(kind, move |envelope| {
                view.lock().apply(envelope);
            });
            (kind, id)
        })
        .collect()
}

/// Reload agents and alerts over REST
pub async fn resync(view: &SharedFleetView, client: &ApiClient) -> Result<()> {
    let (agents, alerts) = tokio::try_join!(client.agents(), client.alerts())
        .context("Failed to reload fleet snapshot")?;

    let mut view = view.lock();
    view.replace_agents(agents);
    view.replace_alerts(alerts);
    debug!(agents = view.agents().len(), alerts = view.alerts().len(), "fleet view resynced");
    Ok(())
}

/// Mirror the channel state into `view` and resync every time it opens.
///
/// Envelopes published while the channel was down are never replayed, so the
/// REST snapshot is the only way to catch up on them.
pub fn track_connection(
    view: SharedFleetView,
    client: ApiClient,
    mut states: watch::Receiver<ConnectionState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            view.lock().set_connected(state == ConnectionState::Open);

            if state == ConnectionState::Open {
                if let Err(e) = resync(&view, &client).await {
                    warn!("{e:#}");
                }
            }
        }
    })
}
