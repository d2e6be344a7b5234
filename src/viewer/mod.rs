//! Observer side of the push channel
//!
//! A viewer keeps a local copy of the fleet in sync with the hub:
//!
//! 1. [`ApiClient`] loads the initial snapshot over REST
//! 2. [`ConnectionManager`] holds one resilient WebSocket to the hub and
//!    reconnects after failures
//! 3. [`EventBus`] hands each decoded envelope to the subscribers for its kind
//! 4. [`FleetView`] is one such subscriber and applies envelopes to its copy

#[cfg(feature = "viewer")]
pub mod bus;
#[cfg(feature = "viewer")]
pub mod client;
#[cfg(feature = "viewer")]
pub mod config;
#[cfg(feature = "viewer")]
pub mod connection;
#[cfg(feature = "viewer")]
pub mod state;
#[cfg(feature = "viewer")]
pub mod transport;

#[cfg(feature = "viewer")]
pub use bus::{EventBus, SubscriptionId};
#[cfg(feature = "viewer")]
pub use client::{ApiClient, RequestError};
#[cfg(feature = "viewer")]
pub use config::ViewerConfig;
#[cfg(feature = "viewer")]
pub use connection::{ConnectionManager, ConnectionState};
#[cfg(feature = "viewer")]
pub use state::{FleetView, SharedFleetView};
#[cfg(feature = "viewer")]
pub use transport::{Connector, MessageStream, WsConnector};
