//! HTTP handlers for the read API

pub mod health;
pub mod risk;
pub mod signals;

use shared::Location;

use crate::error::{AppError, AppResult};
use crate::AppState;

pub use health::health_check;
pub use risk::get_risk;
pub use signals::{
    get_bulletin, get_nowcast, get_radar, get_river_basin, get_station, get_warning,
};

/// Look up a monitored location, 404 when it is not registered
pub(crate) fn resolve_location<'a>(state: &'a AppState, name: &str) -> AppResult<&'a Location> {
    state
        .registry
        .get(name)
        .ok_or_else(|| AppError::NotFound(format!("unknown location {}", name)))
}
