//! Message types for actor communication
//!
//! Every request to the fleet actor carries a oneshot sender for its reply.
//! Replies are owned values (clones of store state), never references.

use tokio::sync::oneshot;

use crate::{
    Agent, Alert, NewPolicy,
    simulator::TickReport,
    store::{FleetOverview, FleetResult},
};

/// Commands that can be sent to the FleetActor
#[derive(Debug)]
pub enum FleetCommand {
    ListAgents {
        respond_to: oneshot::Sender<Vec<Agent>>,
    },

    GetAgent {
        id: String,
        respond_to: oneshot::Sender<FleetResult<Agent>>,
    },

    /// Change an agent's status
    ///
    /// The status arrives unvalidated; the actor rejects anything outside the
    /// closed set before touching the store.
    SetAgentStatus {
        id: String,
        status: String,
        respond_to: oneshot::Sender<FleetResult<Agent>>,
    },

    ListAlerts {
        respond_to: oneshot::Sender<Vec<Alert>>,
    },

    GetAlert {
        id: String,
        respond_to: oneshot::Sender<FleetResult<Alert>>,
    },

    AcknowledgeAlert {
        id: String,
        respond_to: oneshot::Sender<FleetResult<Alert>>,
    },

    /// Compute the fleet overview (read only, never broadcast)
    Overview {
        respond_to: oneshot::Sender<FleetOverview>,
    },

    CreatePolicy {
        agent_id: String,
        policy: NewPolicy,
        respond_to: oneshot::Sender<FleetResult<Agent>>,
    },

    SetPolicyEnabled {
        agent_id: String,
        policy_id: String,
        enabled: bool,
        respond_to: oneshot::Sender<FleetResult<Agent>>,
    },

    /// Run a simulation tick immediately (bypassing the interval timer)
    ///
    /// Used for testing and manual stepping.
    TickNow {
        respond_to: oneshot::Sender<TickReport>,
    },

    /// Gracefully shut down the actor, which also stops the ticker
    Shutdown,
}
