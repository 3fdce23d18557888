//! Persistence gateway
//!
//! Append-only writes for raw payloads, normalized records and the outbound
//! call audit trail, plus point-in-time reads of the latest record per
//! location. Every write is its own statement; not-found is `Ok(None)` or an
//! empty collection, never an error.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use shared::{
    ApiCallLog, BulletinRecord, DistrictWarningRecord, NowcastCategoryFlag, NowcastRecord,
    RadarSnapshot, RawPayload, RiverBasinForecast, StationObservation, Stored,
};

use crate::error::AppResult;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Longest lead time considered a "one hour" probability of precipitation
pub const POP_1H_MAX_LEAD_MINUTES: i32 = 60;

/// Longest lead time returned by a nowcast slice
pub const NOWCAST_SLICE_MAX_LEAD_MINUTES: i32 = 240;

#[async_trait]
pub trait Repository: Send + Sync {
    // Writes

    async fn insert_raw(&self, payload: &RawPayload) -> AppResult<i64>;

    async fn insert_bulletin(&self, record: &BulletinRecord) -> AppResult<i64>;

    async fn insert_district_warning(&self, record: &DistrictWarningRecord) -> AppResult<i64>;

    async fn insert_nowcast(&self, record: &NowcastRecord) -> AppResult<i64>;

    /// Attach a category flag; the referenced nowcast must already exist
    async fn insert_nowcast_category(&self, flag: &NowcastCategoryFlag) -> AppResult<()>;

    async fn insert_river_basin(&self, record: &RiverBasinForecast) -> AppResult<i64>;

    async fn insert_station_observation(&self, record: &StationObservation) -> AppResult<i64>;

    async fn insert_radar_snapshot(&self, record: &RadarSnapshot) -> AppResult<i64>;

    async fn insert_api_call(&self, log: &ApiCallLog) -> AppResult<()>;

    // Reads

    async fn latest_bulletin(&self, location: &str) -> AppResult<Option<Stored<BulletinRecord>>>;

    async fn latest_district_warning(
        &self,
        location: &str,
    ) -> AppResult<Option<Stored<DistrictWarningRecord>>>;

    async fn latest_radar_snapshot(
        &self,
        location: &str,
    ) -> AppResult<Option<Stored<RadarSnapshot>>>;

    /// Current reading of the most recent capture: smallest lead, newest row on ties
    async fn latest_nowcast(&self, location: &str) -> AppResult<Option<Stored<NowcastRecord>>>;

    /// POP of the most recent capture at the largest lead within one hour
    async fn nowcast_pop_1h(&self, location: &str) -> AppResult<Option<f64>>;

    /// All steps of the most recent capture up to four hours ahead, by lead
    async fn nowcast_slice(&self, location: &str) -> AppResult<Vec<Stored<NowcastRecord>>>;

    async fn category_flags(&self, nowcast_id: i64) -> AppResult<HashMap<i32, i16>>;

    /// Flags of the newest nowcast row for a location that carries any.
    /// Stepped captures have no flags and never shadow a district capture.
    async fn latest_nowcast_categories(&self, location: &str) -> AppResult<HashMap<i32, i16>>;

    /// Rows of the most recent fetch for a basin
    async fn latest_river_basin(&self, basin_id: i32)
        -> AppResult<Vec<Stored<RiverBasinForecast>>>;

    async fn latest_station_observation(
        &self,
        station_id: &str,
    ) -> AppResult<Option<Stored<StationObservation>>>;

    /// Cheap connectivity check for the health endpoint
    async fn ping(&self) -> AppResult<()>;
}
