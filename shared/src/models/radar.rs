use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reflectivity summary derived from one radar image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RadarSnapshot {
    pub location: String,
    pub captured_at: DateTime<Utc>,
    pub max_dbz: f64,
    /// Bearing to the strongest cell, degrees clockwise from north
    pub bearing_deg: Option<f64>,
    /// Distance to the strongest cell
    pub range_km: Option<f64>,
}
