//! HTTP handler for the computed risk level

use axum::{
    extract::{Path, State},
    Json,
};
use shared::RiskResult;

use super::resolve_location;
use crate::error::AppResult;
use crate::AppState;

/// Current risk for a location; GREEN when nothing has been ingested yet
pub async fn get_risk(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<RiskResult>> {
    let location = resolve_location(&state, &location)?;
    Ok(Json(state.scoring.score(&location.name).await))
}
