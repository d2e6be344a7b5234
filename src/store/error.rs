//! Error types for fleet operations

use std::fmt;

/// Result type alias for fleet operations
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors returned by the entity store and the command facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    /// No agent with this id
    AgentNotFound(String),

    /// No alert with this id
    AlertNotFound(String),

    /// The agent exists but has no policy with this id
    PolicyNotFound { agent_id: String, policy_id: String },

    /// Requested status is outside the closed set
    InvalidStatus(String),

    /// Any other rejected input (empty names, duplicate seed ids, ...)
    InvalidInput(String),

    /// The fleet actor is no longer running
    Unavailable,
}

impl FleetError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FleetError::AgentNotFound(_)
                | FleetError::AlertNotFound(_)
                | FleetError::PolicyNotFound { .. }
        )
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, FleetError::InvalidStatus(_) | FleetError::InvalidInput(_))
    }
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetError::AgentNotFound(id) => write!(f, "agent not found: {}", id),
            FleetError::AlertNotFound(id) => write!(f, "alert not found: {}", id),
            FleetError::PolicyNotFound {
                agent_id,
                policy_id,
            } => write!(f, "policy {} not found on agent {}", policy_id, agent_id),
            FleetError::InvalidStatus(status) => write!(
                f,
                "invalid status '{}': expected one of active, inactive, error, warning",
                status
            ),
            FleetError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            FleetError::Unavailable => write!(f, "fleet actor is not running"),
        }
    }
}

impl std::error::Error for FleetError {}
