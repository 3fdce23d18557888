use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Quantitative precipitation forecast for one river (sub-)basin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiverBasinForecast {
    pub basin_id: i32,
    pub date: NaiveDate,
    /// Flood meteorological office issuing the forecast
    pub fmo: String,
    pub basin: String,
    pub sub_basin: String,
    pub area: String,
    /// Forecast text for day 1..=5
    pub days: [String; 5],
    /// Average areal precipitation (cumulative)
    pub aap: String,
    pub fetched_at: DateTime<Utc>,
}
