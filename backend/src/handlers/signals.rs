//! HTTP handlers exposing the latest normalized record of each feed

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{
    BulletinRecord, DistrictWarningRecord, NowcastRecord, RadarSnapshot, RiverBasinForecast,
    StationObservation, Stored,
};

use super::resolve_location;
use crate::error::{AppError, AppResult};
use crate::AppState;

fn not_found<T>(what: &str, key: &str) -> AppResult<T> {
    Err(AppError::NotFound(format!("no {} for {}", what, key)))
}

/// Latest summarized bulletin
pub async fn get_bulletin(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<Stored<BulletinRecord>>> {
    let location = resolve_location(&state, &location)?;
    match state.repo.latest_bulletin(&location.name).await? {
        Some(record) => Ok(Json(record)),
        None => not_found("bulletin", &location.name),
    }
}

/// Steps of the latest nowcast capture up to four hours ahead
pub async fn get_nowcast(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<Vec<Stored<NowcastRecord>>>> {
    let location = resolve_location(&state, &location)?;
    let slice = state.repo.nowcast_slice(&location.name).await?;
    if slice.is_empty() {
        return not_found("nowcast", &location.name);
    }
    Ok(Json(slice))
}

/// Latest radar reflectivity snapshot
pub async fn get_radar(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<Stored<RadarSnapshot>>> {
    let location = resolve_location(&state, &location)?;
    match state.repo.latest_radar_snapshot(&location.name).await? {
        Some(record) => Ok(Json(record)),
        None => not_found("radar snapshot", &location.name),
    }
}

/// Latest district warning
pub async fn get_warning(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<Stored<DistrictWarningRecord>>> {
    let location = resolve_location(&state, &location)?;
    match state.repo.latest_district_warning(&location.name).await? {
        Some(record) => Ok(Json(record)),
        None => not_found("district warning", &location.name),
    }
}

/// Rows of the latest basin forecast for the location's river basin
pub async fn get_river_basin(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<Vec<Stored<RiverBasinForecast>>>> {
    let location = resolve_location(&state, &location)?;
    let Some(basin_id) = location.river_basin_id else {
        return not_found("river basin", &location.name);
    };
    let basin_id = i32::try_from(basin_id)
        .map_err(|_| AppError::Internal(format!("basin id {} out of range", basin_id)))?;

    let rows = state.repo.latest_river_basin(basin_id).await?;
    if rows.is_empty() {
        return not_found("river basin forecast", &location.name);
    }
    Ok(Json(rows))
}

/// Latest observation of a weather station
pub async fn get_station(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> AppResult<Json<Stored<StationObservation>>> {
    match state.repo.latest_station_observation(&station_id).await? {
        Some(record) => Ok(Json(record)),
        None => not_found("station observation", &station_id),
    }
}
