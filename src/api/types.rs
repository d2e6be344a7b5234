//! Request and response bodies that are not domain entities
//!
//! Agents, alerts and the overview go over the wire as the domain types
//! themselves. The viewer's REST client reuses these types.

use serde::{Deserialize, Serialize};

/// Body of `PUT /api/agents/:id/status`
///
/// The status is kept as a raw string so an out-of-set value reaches the
/// fleet actor and fails with a readable message instead of a serde error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Body of `PUT /api/agents/:id/policies/:policy_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyToggleRequest {
    pub enabled: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Currently registered push-channel observers
    pub observers: usize,
}
