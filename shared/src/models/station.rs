use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Instantaneous automatic weather station / rain gauge reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationObservation {
    pub station_id: String,
    pub call_sign: String,
    pub district: String,
    pub state: String,
    pub station_name: String,
    pub observed_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub dew_point_c: f64,
    pub relative_humidity: f64,
    pub wind_direction_deg: f64,
    pub wind_speed: f64,
    /// Mean sea level pressure, hPa
    pub mslp_hpa: f64,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub nebulosity: f64,
    pub weather_code: String,
    pub rainfall_selector: String,
    pub rainfall_mm: f64,
}
