//! Fleet rollup endpoint

use axum::{Json, extract::State};

use crate::{
    api::{error::ApiResult, state::ApiState},
    store::FleetOverview,
};

/// GET /api/metrics/overview
pub async fn overview(State(state): State<ApiState>) -> ApiResult<Json<FleetOverview>> {
    Ok(Json(state.fleet.overview().await?))
}
