//! Push-channel envelopes
//!
//! Every message on the real-time channel is a JSON text frame of the form
//! `{"type": ..., "data": ..., "timestamp": ...}`. The `type` tag selects the
//! payload shape:
//!
//! | type                   | data                                   |
//! |------------------------|----------------------------------------|
//! | `connected`            | `{message}`                            |
//! | `metrics_updated`      | full agent array                       |
//! | `agent_status_changed` | `{agentId, status, timestamp}`         |
//! | `alert_acknowledged`   | `{alertId, timestamp}`                 |
//! | `policy_updated`       | `{agentId, policy, timestamp}`         |
//!
//! Types not in this table are tolerated on decode and reported as
//! [`Decoded::Unrecognized`] so newer hubs can talk to older observers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Agent, AgentStatus, Policy};

/// Greeting sent as the first envelope on every new observer channel
pub const GREETING: &str = "Connected to AgentWatch real-time updates";

/// Closed set of envelope types understood by this version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    MetricsUpdated,
    AgentStatusChanged,
    AlertAcknowledged,
    PolicyUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Connected,
        EventKind::MetricsUpdated,
        EventKind::AgentStatusChanged,
        EventKind::AlertAcknowledged,
        EventKind::PolicyUpdated,
    ];

    /// Wire tag of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::MetricsUpdated => "metrics_updated",
            EventKind::AgentStatusChanged => "agent_status_changed",
            EventKind::AlertAcknowledged => "alert_acknowledged",
            EventKind::PolicyUpdated => "policy_updated",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        EventKind::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub agent_id: String,
    pub status: AgentStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertAck {
    pub alert_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A policy was created or toggled; carries the policy as it now stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyChange {
    pub agent_id: String,
    pub policy: Policy,
    pub timestamp: DateTime<Utc>,
}

/// Typed payload of an envelope
#[derive(Debug, Clone, PartialEq)]
pub enum FleetEvent {
    Connected(Greeting),
    MetricsUpdated(Vec<Agent>),
    AgentStatusChanged(StatusChange),
    AlertAcknowledged(AlertAck),
    PolicyUpdated(PolicyChange),
}

impl FleetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            FleetEvent::Connected(_) => EventKind::Connected,
            FleetEvent::MetricsUpdated(_) => EventKind::MetricsUpdated,
            FleetEvent::AgentStatusChanged(_) => EventKind::AgentStatusChanged,
            FleetEvent::AlertAcknowledged(_) => EventKind::AlertAcknowledged,
            FleetEvent::PolicyUpdated(_) => EventKind::PolicyUpdated,
        }
    }
}

/// One message on the push channel
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub event: FleetEvent,
    /// Emission time
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct WireEnvelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a T,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
    timestamp: DateTime<Utc>,
}

/// Outcome of decoding a text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(Envelope),
    /// Well-formed envelope with a type this version doesn't know
    Unrecognized { kind: String },
}

impl Envelope {
    /// Stamp an event with the current time
    pub fn new(event: FleetEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    pub fn connected() -> Self {
        Self::new(FleetEvent::Connected(Greeting {
            message: GREETING.to_string(),
        }))
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Serialize to the JSON text frame sent to observers
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match &self.event {
            FleetEvent::Connected(data) => self.wire(data),
            FleetEvent::MetricsUpdated(data) => self.wire(data),
            FleetEvent::AgentStatusChanged(data) => self.wire(data),
            FleetEvent::AlertAcknowledged(data) => self.wire(data),
            FleetEvent::PolicyUpdated(data) => self.wire(data),
        }
    }

    fn wire<T: Serialize>(&self, data: &T) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireEnvelope {
            kind: self.kind().as_str(),
            data,
            timestamp: self.timestamp,
        })
    }

    /// Parse a JSON text frame
    pub fn decode(text: &str) -> Result<Decoded, DecodeError> {
        let raw: RawEnvelope = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

        let Some(kind) = EventKind::parse(&raw.kind) else {
            return Ok(Decoded::Unrecognized { kind: raw.kind });
        };

        let payload = |source: serde_json::Error| DecodeError::Payload { kind, source };

        let event = match kind {
            EventKind::Connected => {
                FleetEvent::Connected(serde_json::from_value(raw.data).map_err(payload)?)
            }
            EventKind::MetricsUpdated => {
                FleetEvent::MetricsUpdated(serde_json::from_value(raw.data).map_err(payload)?)
            }
            EventKind::AgentStatusChanged => {
                FleetEvent::AgentStatusChanged(serde_json::from_value(raw.data).map_err(payload)?)
            }
            EventKind::AlertAcknowledged => {
                FleetEvent::AlertAcknowledged(serde_json::from_value(raw.data).map_err(payload)?)
            }
            EventKind::PolicyUpdated => {
                FleetEvent::PolicyUpdated(serde_json::from_value(raw.data).map_err(payload)?)
            }
        };

        Ok(Decoded::Event(Envelope {
            event,
            timestamp: raw.timestamp,
        }))
    }
}

/// A text frame that could not be turned into an envelope
#[derive(Debug)]
pub enum DecodeError {
    /// Not JSON, or missing `type`/`timestamp`
    Malformed(serde_json::Error),

    /// Known type whose `data` doesn't match the expected shape
    Payload {
        kind: EventKind,
        source: serde_json::Error,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(err) => write!(f, "malformed envelope: {}", err),
            DecodeError::Payload { kind, source } => {
                write!(f, "invalid {} payload: {}", kind, source)
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Malformed(err) => Some(err),
            DecodeError::Payload { source, .. } => Some(source),
        }
    }
}
