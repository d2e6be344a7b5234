//! API shared state containing actor handles

use crate::{actors::fleet::FleetHandle, broadcast::Broadcaster};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Command facade in front of the fleet actor
    pub fleet: FleetHandle,

    /// Observer registry for the push channel
    pub broadcaster: Broadcaster,
}

impl ApiState {
    pub fn new(fleet: FleetHandle, broadcaster: Broadcaster) -> Self {
        Self { fleet, broadcaster }
    }
}
