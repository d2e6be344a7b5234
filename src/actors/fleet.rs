//! FleetActor - Owns the entity store and runs the simulation ticker
//!
//! The actor is the single writer of fleet state. Commands from the API and
//! ticks from the interval timer are handled one at a time in the same loop,
//! so store mutations never interleave.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick ──▶ Simulator::tick ──▶ publish metrics_updated
//!     ↑
//!     └─── Commands ──▶ FleetStore ──▶ publish agent_status_changed / alert_acknowledged / policy_updated
//! ```
//!
//! A rejected command (unknown id, invalid status, blank policy name) leaves the
//! store untouched and publishes nothing.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, instrument, trace, warn};

use crate::{
    Agent, AgentStatus, Alert, NewPolicy,
    broadcast::Broadcaster,
    events::{AlertAck, FleetEvent, PolicyChange, StatusChange},
    simulator::{Simulator, TickReport},
    store::{FleetError, FleetOverview, FleetResult, FleetStore},
};

use super::messages::FleetCommand;

/// Actor that owns the fleet store
pub struct FleetActor {
    store: FleetStore,

    simulator: Simulator,

    broadcaster: Broadcaster,

    /// Command receiver for requests and control messages
    command_rx: mpsc::Receiver<FleetCommand>,

    /// Simulation period; `None` leaves ticking to `TickNow`
    tick_interval: Option<Duration>,
}

impl FleetActor {
    pub fn new(
        store: FleetStore,
        simulator: Simulator,
        broadcaster: Broadcaster,
        command_rx: mpsc::Receiver<FleetCommand>,
        tick_interval: Option<Duration>,
    ) -> Self {
        Self {
            store,
            simulator,
            broadcaster,
            command_rx,
            tick_interval,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - A Shutdown command is received
    /// - Every handle has been dropped
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting fleet actor");

        // First tick fires one full period after start
        let mut ticker = self.tick_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    self.tick().await;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(FleetCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("fleet actor stopped");
    }

    async fn handle_command(&mut self, cmd: FleetCommand) {
        match cmd {
            FleetCommand::ListAgents { respond_to } => {
                let _ = respond_to.send(self.store.get_all());
            }

            FleetCommand::GetAgent { id, respond_to } => {
                let _ = respond_to.send(self.store.get_by_id(&id));
            }

            FleetCommand::SetAgentStatus {
                id,
                status,
                respond_to,
            } => {
                let result = self.set_agent_status(&id, &status).await;
                let _ = respond_to.send(result);
            }

            FleetCommand::ListAlerts { respond_to } => {
                let _ = respond_to.send(self.store.get_alerts());
            }

            FleetCommand::GetAlert { id, respond_to } => {
                let _ = respond_to.send(self.store.get_alert_by_id(&id));
            }

            FleetCommand::AcknowledgeAlert { id, respond_to } => {
                let result = self.acknowledge_alert(&id).await;
                let _ = respond_to.send(result);
            }

            FleetCommand::Overview { respond_to } => {
                let _ = respond_to.send(self.store.overview(Utc::now()));
            }

            FleetCommand::CreatePolicy {
                agent_id,
                policy,
                respond_to,
            } => {
                let result = self.create_policy(&agent_id, policy).await;
                let _ = respond_to.send(result);
            }

            FleetCommand::SetPolicyEnabled {
                agent_id,
                policy_id,
                enabled,
                respond_to,
            } => {
                let result = self.set_policy_enabled(&agent_id, &policy_id, enabled).await;
                let _ = respond_to.send(result);
            }

            FleetCommand::TickNow { respond_to } => {
                debug!("received TickNow command");
                let report = self.tick().await;
                let _ = respond_to.send(report);
            }

            // Handled by the run loop
            FleetCommand::Shutdown => {}
        }
    }

    /// Step the simulator and push the whole fleet to observers.
    async fn tick(&mut self) -> TickReport {
        let report = self.simulator.tick(&mut self.store, Utc::now());

        let delivery = self
            .broadcaster
            .publish(FleetEvent::MetricsUpdated(self.store.get_all()))
            .await;
        trace!(delivered = delivery.delivered, "broadcast metrics update");

        report
    }

    async fn set_agent_status(&mut self, id: &str, status: &str) -> FleetResult<Agent> {
        if !self.store.contains_agent(id) {
            return Err(FleetError::AgentNotFound(id.to_string()));
        }

        let status: AgentStatus = status
            .parse()
            .map_err(|_| FleetError::InvalidStatus(status.to_string()))?;

        let now = Utc::now();
        let agent = self.store.set_agent_status(id, status, now)?;

        self.broadcaster
            .publish(FleetEvent::AgentStatusChanged(StatusChange {
                agent_id: agent.id.clone(),
                status,
                timestamp: now,
            }))
            .await;

        Ok(agent)
    }

    async fn acknowledge_alert(&mut self, id: &str) -> FleetResult<Alert> {
        let now = Utc::now();
        let alert = self.store.acknowledge_alert(id, now)?;

        self.broadcaster
            .publish(FleetEvent::AlertAcknowledged(AlertAck {
                alert_id: alert.id.clone(),
                timestamp: now,
            }))
            .await;

        Ok(alert)
    }

    async fn create_policy(&mut self, agent_id: &str, policy: NewPolicy) -> FleetResult<Agent> {
        let now = Utc::now();
        let agent = self.store.add_policy(agent_id, policy, now)?;

        if let Some(created) = agent.policies.last() {
            self.publish_policy(&agent.id, created.clone()).await;
        }

        Ok(agent)
    }

    async fn set_policy_enabled(
        &mut self,
        agent_id: &str,
        policy_id: &str,
        enabled: bool,
    ) -> FleetResult<Agent> {
        let now = Utc::now();
        let agent = self
            .store
            .set_policy_enabled(agent_id, policy_id, enabled, now)?;

        if let Some(policy) = agent.policy(policy_id) {
            self.publish_policy(&agent.id, policy.clone()).await;
        }

        Ok(agent)
    }

    async fn publish_policy(&self, agent_id: &str, policy: crate::Policy) {
        self.broadcaster
            .publish(FleetEvent::PolicyUpdated(PolicyChange {
                agent_id: agent_id.to_string(),
                timestamp: policy.last_updated,
                policy,
            }))
            .await;
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle for talking to a FleetActor
///
/// This is the command facade used by the API layer. It can be cloned and
/// shared across tasks; every clone talks to the same actor.
#[derive(Clone)]
pub struct FleetHandle {
    sender: mpsc::Sender<FleetCommand>,
}

impl FleetHandle {
    /// Spawn a new fleet actor owning `store`
    pub fn spawn(
        store: FleetStore,
        simulator: Simulator,
        broadcaster: Broadcaster,
        tick_interval: Option<Duration>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        let actor = FleetActor::new(store, simulator, broadcaster, cmd_rx, tick_interval);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> FleetCommand,
    ) -> FleetResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| FleetError::Unavailable)?;

        rx.await.map_err(|_| FleetError::Unavailable)
    }

    pub async fn agents(&self) -> FleetResult<Vec<Agent>> {
        self.request(|respond_to| FleetCommand::ListAgents { respond_to })
            .await
    }

    pub async fn agent(&self, id: &str) -> FleetResult<Agent> {
        self.request(|respond_to| FleetCommand::GetAgent {
            id: id.to_string(),
            respond_to,
        })
        .await?
    }

    pub async fn set_agent_status(&self, id: &str, status: &str) -> FleetResult<Agent> {
        self.request(|respond_to| FleetCommand::SetAgentStatus {
            id: id.to_string(),
            status: status.to_string(),
            respond_to,
        })
        .await?
    }

    pub async fn alerts(&self) -> FleetResult<Vec<Alert>> {
        self.request(|respond_to| FleetCommand::ListAlerts { respond_to })
            .await
    }

    pub async fn alert(&self, id: &str) -> FleetResult<Alert> {
        self.request(|respond_to| FleetCommand::GetAlert {
            id: id.to_string(),
            respond_to,
        })
        .await?
    }

    pub async fn acknowledge_alert(&self, id: &str) -> FleetResult<Alert> {
        self.request(|respond_to| FleetCommand::AcknowledgeAlert {
            id: id.to_string(),
            respond_to,
        })
        .await?
    }

    pub async fn overview(&self) -> FleetResult<FleetOverview> {
        self.request(|respond_to| FleetCommand::Overview { respond_to })
            .await
    }

    pub async fn create_policy(&self, agent_id: &str, policy: NewPolicy) -> FleetResult<Agent> {
        self.request(|respond_to| FleetCommand::CreatePolicy {
            agent_id: agent_id.to_string(),
            policy,
            respond_to,
        })
        .await?
    }

    pub async fn set_policy_enabled(
        &self,
        agent_id: &str,
        policy_id: &str,
        enabled: bool,
    ) -> FleetResult<Agent> {
        self.request(|respond_to| FleetCommand::SetPolicyEnabled {
            agent_id: agent_id.to_string(),
            policy_id: policy_id.to_string(),
            enabled,
            respond_to,
        })
        .await?
    }

    /// Run one simulation tick now
    pub async fn tick_now(&self) -> FleetResult<TickReport> {
        self.request(|respond_to| FleetCommand::TickNow { respond_to })
            .await
    }

    /// Gracefully shut down the actor
    pub async fn shutdown(&self) -> FleetResult<()> {
        self.sender
            .send(FleetCommand::Shutdown)
            .await
            .map_err(|_| FleetError::Unavailable)
    }
}
