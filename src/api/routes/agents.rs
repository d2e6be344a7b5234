//! Agent and policy endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use crate::{
    Agent, NewPolicy,
    api::{
        error::ApiResult,
        state::ApiState,
        types::{PolicyToggleRequest, StatusUpdateRequest},
    },
};

/// Unpack a JSON body, reporting an unknown agent (404) ahead of a malformed
/// body (400)
async fn agent_body<T>(
    state: &ApiState,
    id: &str,
    body: Result<Json<T>, JsonRejection>,
) -> ApiResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            state.fleet.agent(id).await?;
            Err(rejection.into())
        }
    }
}

/// GET /api/agents
pub async fn list_agents(State(state): State<ApiState>) -> ApiResult<Json<Vec<Agent>>> {
    Ok(Json(state.fleet.agents().await?))
}

/// GET /api/agents/:id
pub async fn get_agent(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(state.fleet.agent(&id).await?))
}

/// PUT /api/agents/:id/status
///
/// Unknown agents are reported (404) before the body or the status is
/// validated (400).
pub async fn update_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Agent>> {
    let request = agent_body(&state, &id, body).await?;
    let agent = state.fleet.set_agent_status(&id, &request.status).await?;
    info!(agent = %agent.id, status = %agent.status, "agent status updated");
    Ok(Json(agent))
}

/// POST /api/agents/:id/policies
///
/// Returns 201 with the owning agent, the new policy last in its list.
pub async fn create_policy(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<NewPolicy>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let policy = agent_body(&state, &id, body).await?;
    let agent = state.fleet.create_policy(&id, policy).await?;
    info!(agent = %agent.id, "policy created");
    Ok((StatusCode::CREATED, Json(agent)))
}

/// PUT /api/agents/:id/policies/:policy_id
pub async fn toggle_policy(
    State(state): State<ApiState>,
    Path((id, policy_id)): Path<(String, String)>,
    body: Result<Json<PolicyToggleRequest>, JsonRejection>,
) -> ApiResult<Json<Agent>> {
    let request = agent_body(&state, &id, body).await?;
    let agent = state
        .fleet
        .set_policy_enabled(&id, &policy_id, request.enabled)
        .await?;
    info!(agent = %agent.id, policy = %policy_id, enabled = request.enabled, "policy toggled");
    Ok(Json(agent))
}
