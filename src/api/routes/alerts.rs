//! Alert endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use crate::{
    Alert,
    api::{error::ApiResult, state::ApiState},
};

/// GET /api/alerts
pub async fn list_alerts(State(state): State<ApiState>) -> ApiResult<Json<Vec<Alert>>> {
    Ok(Json(state.fleet.alerts().await?))
}

/// GET /api/alerts/:id
pub async fn get_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Alert>> {
    Ok(Json(state.fleet.alert(&id).await?))
}

/// PUT /api/alerts/:id/acknowledge
///
/// Acknowledging an already acknowledged alert succeeds and is broadcast again.
pub async fn acknowledge_alert(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Alert>> {
    let alert = state.fleet.acknowledge_alert(&id).await?;
    info!(alert = %alert.id, "alert acknowledged");
    Ok(Json(alert))
}
