//! Route definitions for the Weatherboy read API

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Versioned API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/risk/:location", get(handlers::get_risk))
        .route("/bulletin/:location", get(handlers::get_bulletin))
        .route("/nowcast/:location", get(handlers::get_nowcast))
        .route("/radar/:location", get(handlers::get_radar))
        .route("/warning/:location", get(handlers::get_warning))
        .route("/riverbasin/:location", get(handlers::get_river_basin))
        .route("/station/:station_id", get(handlers::get_station))
}
