//! Automatic weather station / rain gauge adapter
//!
//! Strict: a single unparsable value rejects the whole response, since a
//! partially wrong reading is worse than a missing one.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use shared::{parse_f64_field, parse_ist_datetime, FeedKind, StationObservation};

use super::json::{decode_rows, lenient_string};
use super::pipeline::{FeedFormat, IngestPipeline, RawRef};
use super::{with_id, FeedAdapter};
use crate::error::AppResult;
use crate::repository::Repository;

/// One row of the station data API
#[derive(Debug, Clone, Deserialize)]
pub struct StationRow {
    #[serde(rename = "ID", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "CALL_SIGN", default, deserialize_with = "lenient_string")]
    pub call_sign: String,
    #[serde(rename = "DISTRICT", default, deserialize_with = "lenient_string")]
    pub district: String,
    #[serde(rename = "STATE", default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(rename = "STATION", default, deserialize_with = "lenient_string")]
    pub station: String,
    #[serde(rename = "DATE", default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "TIME", default, deserialize_with = "lenient_string")]
    pub time: String,
    #[serde(rename = "CURR_TEMP", default, deserialize_with = "lenient_string")]
    pub curr_temp: String,
    #[serde(rename = "DEW_POINT_TEMP", default, deserialize_with = "lenient_string")]
    pub dew_point_temp: String,
    #[serde(rename = "RH", default, deserialize_with = "lenient_string")]
    pub rh: String,
    #[serde(rename = "WIND_DIRECTION", default, deserialize_with = "lenient_string")]
    pub wind_direction: String,
    #[serde(rename = "WIND_SPEED", default, deserialize_with = "lenient_string")]
    pub wind_speed: String,
    #[serde(rename = "MSLP", default, deserialize_with = "lenient_string")]
    pub mslp: String,
    #[serde(rename = "MIN_TEMP", default, deserialize_with = "lenient_string")]
    pub min_temp: String,
    #[serde(rename = "MAX_TEMP", default, deserialize_with = "lenient_string")]
    pub max_temp: String,
    #[serde(rename = "Latitude", default, deserialize_with = "lenient_string")]
    pub latitude: String,
    #[serde(rename = "Longitude", default, deserialize_with = "lenient_string")]
    pub longitude: String,
    #[serde(rename = "WEATHER_CODE", default, deserialize_with = "lenient_string")]
    pub weather_code: String,
    #[serde(rename = "NEBULOSITY", default, deserialize_with = "lenient_string")]
    pub nebulosity: String,
    #[serde(rename = "Feel Like", default, deserialize_with = "lenient_string")]
    pub feel_like: String,
    #[serde(rename = "RAINFALL_SEL", default, deserialize_with = "lenient_string")]
    pub rainfall_sel: String,
    #[serde(rename = "RAINFALL", default, deserialize_with = "lenient_string")]
    pub rainfall: String,
}

pub struct StationAdapter {
    pipeline: Arc<IngestPipeline>,
    station_id: String,
    base_url: String,
}

impl StationAdapter {
    pub fn new(pipeline: Arc<IngestPipeline>, station_id: String, base_url: String) -> Self {
        Self {
            pipeline,
            station_id,
            base_url,
        }
    }
}

#[async_trait]
impl FeedAdapter for StationAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::StationObservation, self.station_id)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::StationObservation
    }

    async fn fetch(&self) -> AppResult<usize> {
        let url = with_id(&self.base_url, &self.station_id);
        self.pipeline.ingest(self, &url, &self.station_id).await
    }
}

#[async_trait]
impl FeedFormat for StationAdapter {
    type Decoded = Vec<StationRow>;
    type Record = StationObservation;

    fn feed(&self) -> FeedKind {
        FeedKind::StationObservation
    }

    fn location(&self) -> Option<&str> {
        None
    }

    fn decode(&self, body: &[u8]) -> AppResult<Vec<StationRow>> {
        decode_rows(FeedKind::StationObservation.as_str(), body)
    }

    async fn transform(&self, rows: Vec<StationRow>, _raw: RawRef) -> AppResult<Vec<StationObservation>> {
        rows.into_iter()
            .map(|row| normalize_station(&self.station_id, row))
            .collect()
    }

    async fn persist(
        &self,
        repo: &dyn Repository,
        records: Vec<StationObservation>,
    ) -> AppResult<usize> {
        for record in &records {
            repo.insert_station_observation(record).await?;
        }
        Ok(records.len())
    }
}

/// Convert one row; rows without an `ID` are attributed to the polled station
pub fn normalize_station(polled_id: &str, row: StationRow) -> AppResult<StationObservation> {
    let station_id = if row.id.trim().is_empty() {
        polled_id.to_string()
    } else {
        row.id.trim().to_string()
    };

    Ok(StationObservation {
        observed_at: parse_ist_datetime("DATE/TIME", &row.date, &row.time, "%H:%M:%S")?,
        temperature_c: parse_f64_field("CURR_TEMP", &row.curr_temp)?,
        dew_point_c: parse_f64_field("DEW_POINT_TEMP", &row.dew_point_temp)?,
        relative_humidity: parse_f64_field("RH", &row.rh)?,
        wind_direction_deg: parse_f64_field("WIND_DIRECTION", &row.wind_direction)?,
        wind_speed: parse_f64_field("WIND_SPEED", &row.wind_speed)?,
        mslp_hpa: parse_f64_field("MSLP", &row.mslp)?,
        min_temperature_c: parse_f64_field("MIN_TEMP", &row.min_temp)?,
        max_temperature_c: parse_f64_field("MAX_TEMP", &row.max_temp)?,
        latitude: parse_f64_field("Latitude", &row.latitude)?,
        longitude: parse_f64_field("Longitude", &row.longitude)?,
        nebulosity: parse_f64_field("NEBULOSITY", &row.nebulosity)?,
        rainfall_mm: parse_f64_field("RAINFALL", &row.rainfall)?,
        station_id,
        call_sign: row.call_sign,
        district: row.district,
        state: row.state,
        station_name: row.station,
        weather_code: row.weather_code,
        rainfall_selector: row.rainfall_sel,
    })
}
