pub mod actors;
pub mod api;
pub mod broadcast;
pub mod config;
pub mod events;
pub mod seed;
pub mod simulator;
pub mod store;
pub mod util;
pub mod viewer;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque per-policy settings, passed through untouched.
pub type PolicyConfiguration = serde_json::Map<String, serde_json::Value>;

/// Returned when a wire string is not a member of one of the closed sets below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCategory {
    Chatbot,
    Assistant,
    Workflow,
    Analysis,
}

/// Lifecycle status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Error,
    Warning,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 4] = [
        AgentStatus::Active,
        AgentStatus::Inactive,
        AgentStatus::Error,
        AgentStatus::Warning,
    ];

    /// Get the string representation (lowercase)
    ///
    /// This matches the serde serialization format.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Error => "error",
            AgentStatus::Warning => "warning",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "agent status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    RateLimit,
    ContentFilter,
    AccessControl,
    DataRetention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Performance,
    Error,
    Policy,
    Security,
}

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "severity",
                value: s.to_string(),
            })
    }
}

/// Rollup block reported alongside the live counters of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub total_requests: u64,
    pub success_rate: f64,
    pub average_response_time: f64,
    pub tokens_used: u64,
    pub cost_today: f64,
    pub alerts_triggered: u32,
}

/// A monitored agent with its live counters and attached policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: AgentCategory,
    pub status: AgentStatus,
    pub last_activity: DateTime<Utc>,
    pub requests_today: u64,
    /// Fraction of failed requests, always within [0, 1]
    pub error_rate: f64,
    /// Average response time in milliseconds
    pub response_time: u64,
    pub owner: String,
    pub environment: Environment,
    #[serde(default)]
    pub policies: Vec<Policy>,
    pub metrics: AgentMetrics,
}

impl Agent {
    /// Move the last-activity timestamp forward. Earlier instants are ignored.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    pub fn policy(&self, policy_id: &str) -> Option<&Policy> {
        self.policies.iter().find(|policy| policy.id == policy_id)
    }
}

/// A toggleable governance rule owned by a single agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PolicyKind,
    pub enabled: bool,
    #[serde(default)]
    pub configuration: PolicyConfiguration,
    pub last_updated: DateTime<Utc>,
}

/// Request to attach a policy to an agent; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPolicy {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PolicyKind,
    #[serde(default = "default_policy_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub configuration: PolicyConfiguration,
}

fn default_policy_enabled() -> bool {
    true
}

/// A notable condition raised for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    /// Agent the alert refers to (relation only)
    pub agent_id: String,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Mark the alert as acknowledged. The first acknowledgement wins; the flag
    /// and its timestamp are never reset.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        if !self.acknowledged {
            self.acknowledged = true;
            self.acknowledged_at = Some(now);
        }
    }
}
