//! REST API and WebSocket push channel for the fleet hub
//!
//! Every handler talks to the fleet actor through a [`FleetHandle`]; none of
//! them touch the store directly. Successful mutations are broadcast by the
//! actor itself, so handlers only translate between HTTP and commands.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check with observer count
//! - `GET /api/agents` - List agents
//! - `GET /api/agents/:id` - Get one agent
//! - `PUT /api/agents/:id/status` - Change an agent's status
//! - `POST /api/agents/:id/policies` - Attach a new policy
//! - `PUT /api/agents/:id/policies/:policy_id` - Enable or disable a policy
//! - `GET /api/alerts` - List alerts
//! - `GET /api/alerts/:id` - Get one alert
//! - `PUT /api/alerts/:id/acknowledge` - Acknowledge an alert
//! - `GET /api/metrics/overview` - Fleet rollup
//! - `WS /ws` - Real-time envelope stream
//!
//! [`FleetHandle`]: crate::actors::fleet::FleetHandle

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
pub mod types;
#[cfg(feature = "api")]
pub mod websocket;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
pub use types::{HealthResponse, PolicyToggleRequest, StatusUpdateRequest};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use tracing::info;

use crate::{config::HubConfig, util::get_bind_addr};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:3001")
    pub bind_addr: SocketAddr,

    /// Enable CORS for browser dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: get_bind_addr(),
            enable_cors: true,
        }
    }
}

impl From<&HubConfig> for ApiConfig {
    fn from(config: &HubConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.unwrap_or_else(get_bind_addr),
            enable_cors: config.enable_cors,
        }
    }
}

/// Build the router with every route attached to `state`
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/agents", get(routes::agents::list_agents))
        .route("/api/agents/:id", get(routes::agents::get_agent))
        .route("/api/agents/:id/status", put(routes::agents::update_status))
        .route("/api/agents/:id/policies", post(routes::agents::create_policy))
        .route(
            "/api/agents/:id/policies/:policy_id",
            put(routes::agents::toggle_policy),
        )
        .route("/api/alerts", get(routes::alerts::list_alerts))
        .route("/api/alerts/:id", get(routes::alerts::get_alert))
        .route(
            "/api/alerts/:id/acknowledge",
            put(routes::alerts::acknowledge_alert),
        )
        .route("/api/metrics/overview", get(routes::metrics::overview))
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use anyhow::Context;
    use tower_http::cors::{Any, CorsLayer};

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
