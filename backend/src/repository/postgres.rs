//! PostgreSQL repository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    ApiCallLog, BulletinRecord, DistrictWarningRecord, NowcastCategoryFlag, NowcastRecord,
    RadarSnapshot, RawContent, RawPayload, RiverBasinForecast, StationObservation, Stored,
    WarningColor,
};
use sqlx::{FromRow, PgPool};

use super::{Repository, NOWCAST_SLICE_MAX_LEAD_MINUTES, POP_1H_MAX_LEAD_MINUTES};
use crate::error::AppResult;

/// Repository over a sqlx connection pool
#[derive(Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[derive(Debug, FromRow)]
struct BulletinRow {
    id: i64,
    location: String,
    raw_payload_id: Option<i64>,
    issued_at: DateTime<Utc>,
    forecast: String,
}

impl From<BulletinRow> for Stored<BulletinRecord> {
    fn from(row: BulletinRow) -> Self {
        Stored::new(
            row.id,
            BulletinRecord {
                location: row.location,
                raw_payload_id: row.raw_payload_id,
                issued_at: row.issued_at,
                text: row.forecast,
            },
        )
    }
}

#[derive(Debug, FromRow)]
struct DistrictWarningRow {
    id: i64,
    location: String,
    issued_at: DateTime<Utc>,
    day1_text: String,
    day2_text: String,
    day3_text: String,
    day4_text: String,
    day5_text: String,
    day1_color: String,
    day2_color: String,
    day3_color: String,
    day4_color: String,
    day5_color: String,
}

impl From<DistrictWarningRow> for Stored<DistrictWarningRecord> {
    fn from(row: DistrictWarningRow) -> Self {
        Stored::new(
            row.id,
            DistrictWarningRecord {
                location: row.location,
                issued_at: row.issued_at,
                warnings: [
                    row.day1_text,
                    row.day2_text,
                    row.day3_text,
                    row.day4_text,
                    row.day5_text,
                ],
                colors: [
                    WarningColor::parse_lenient(&row.day1_color),
                    WarningColor::parse_lenient(&row.day2_color),
                    WarningColor::parse_lenient(&row.day3_color),
                    WarningColor::parse_lenient(&row.day4_color),
                    WarningColor::parse_lenient(&row.day5_color),
                ],
            },
        )
    }
}

#[derive(Debug, FromRow)]
struct NowcastRow {
    id: i64,
    location: String,
    captured_at: DateTime<Utc>,
    lead_minutes: i32,
    pop: f64,
    intensity_mm_per_hr: f64,
}

impl From<NowcastRow> for Stored<NowcastRecord> {
    fn from(row: NowcastRow) -> Self {
        Stored::new(
            row.id,
            NowcastRecord {
                location: row.location,
                captured_at: row.captured_at,
                lead_minutes: row.lead_minutes,
                pop: row.pop,
                intensity_mm_per_hr: row.intensity_mm_per_hr,
            },
        )
    }
}

#[derive(Debug, FromRow)]
struct RiverBasinRow {
    id: i64,
    basin_id: i32,
    date: NaiveDate,
    fmo: String,
    basin: String,
    sub_basin: String,
    area: String,
    day1: String,
    day2: String,
    day3: String,
    day4: String,
    day5: String,
    aap: String,
    fetched_at: DateTime<Utc>,
}

impl From<RiverBasinRow> for Stored<RiverBasinForecast> {
    fn from(row: RiverBasinRow) -> Self {
        Stored::new(
            row.id,
            RiverBasinForecast {
                basin_id: row.basin_id,
                date: row.date,
                fmo: row.fmo,
                basin: row.basin,
                sub_basin: row.sub_basin,
                area: row.area,
                days: [row.day1, row.day2, row.day3, row.day4, row.day5],
                aap: row.aap,
                fetched_at: row.fetched_at,
            },
        )
    }
}

#[derive(Debug, FromRow)]
struct StationRow {
    id: i64,
    station_id: String,
    call_sign: String,
    district: String,
    state: String,
    station_name: String,
    observed_at: DateTime<Utc>,
    temperature_c: f64,
    dew_point_c: f64,
    relative_humidity: f64,
    wind_direction_deg: f64,
    wind_speed: f64,
    mslp_hpa: f64,
    min_temperature_c: f64,
    max_temperature_c: f64,
    latitude: f64,
    longitude: f64,
    nebulosity: f64,
    weather_code: String,
    rainfall_selector: String,
    rainfall_mm: f64,
}

impl From<StationRow> for Stored<StationObservation> {
    fn from(row: StationRow) -> Self {
        Stored::new(
            row.id,
            StationObservation {
                station_id: row.station_id,
                call_sign: row.call_sign,
                district: row.district,
                state: row.state,
                station_name: row.station_name,
                observed_at: row.observed_at,
                temperature_c: row.temperature_c,
                dew_point_c: row.dew_point_c,
                relative_humidity: row.relative_humidity,
                wind_direction_deg: row.wind_direction_deg,
                wind_speed: row.wind_speed,
                mslp_hpa: row.mslp_hpa,
                min_temperature_c: row.min_temperature_c,
                max_temperature_c: row.max_temperature_c,
                latitude: row.latitude,
                longitude: row.longitude,
                nebulosity: row.nebulosity,
                weather_code: row.weather_code,
                rainfall_selector: row.rainfall_selector,
                rainfall_mm: row.rainfall_mm,
            },
        )
    }
}

#[derive(Debug, FromRow)]
struct RadarRow {
    id: i64,
    location: String,
    captured_at: DateTime<Utc>,
    max_dbz: f64,
    bearing_deg: Option<f64>,
    range_km: Option<f64>,
}

impl From<RadarRow> for Stored<RadarSnapshot> {
    fn from(row: RadarRow) -> Self {
        Stored::new(
            row.id,
            RadarSnapshot {
                location: row.location,
                captured_at: row.captured_at,
                max_dbz: row.max_dbz,
                bearing_deg: row.bearing_deg,
                range_km: row.range_km,
            },
        )
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn insert_raw(&self, payload: &RawPayload) -> AppResult<i64> {
        let (body, file_path): (Option<&[u8]>, Option<&str>) = match &payload.content {
            RawContent::Bytes(bytes) => (Some(bytes.as_slice()), None),
            RawContent::File(path) => (None, Some(path.as_str())),
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO raw_payload (feed, location, fetched_at, body, file_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(payload.feed.as_str())
        .bind(&payload.location)
        .bind(payload.fetched_at)
        .bind(body)
        .bind(file_path)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_bulletin(&self, record: &BulletinRecord) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bulletin (location, raw_payload_id, issued_at, forecast)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&record.location)
        .bind(record.raw_payload_id)
        .bind(record.issued_at)
        .bind(&record.text)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_district_warning(&self, record: &DistrictWarningRecord) -> AppResult<i64> {
        let [t1, t2, t3, t4, t5] = &record.warnings;
        let [c1, c2, c3, c4, c5] = record.colors;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO district_warning (
                location, issued_at,
                day1_text, day2_text, day3_text, day4_text, day5_text,
                day1_color, day2_color, day3_color, day4_color, day5_color
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&record.location)
        .bind(record.issued_at)
        .bind(t1)
        .bind(t2)
        .bind(t3)
        .bind(t4)
        .bind(t5)
        .bind(c1.as_str())
        .bind(c2.as_str())
        .bind(c3.as_str())
        .bind(c4.as_str())
        .bind(c5.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_nowcast(&self, record: &NowcastRecord) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO nowcast (location, captured_at, lead_minutes, pop, intensity_mm_per_hr)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&record.location)
        .bind(record.captured_at)
        .bind(record.lead_minutes)
        .bind(record.pop)
        .bind(record.intensity_mm_per_hr)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_nowcast_category(&self, flag: &NowcastCategoryFlag) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO nowcast_category (nowcast_id, category, value)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(flag.nowcast_id)
        .bind(flag.category)
        .bind(flag.value)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn insert_river_basin(&self, record: &RiverBasinForecast) -> AppResult<i64> {
        let [d1, d2, d3, d4, d5] = &record.days;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO river_basin_forecast (
                basin_id, date, fmo, basin, sub_basin, area,
                day1, day2, day3, day4, day5, aap, fetched_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(record.basin_id)
        .bind(record.date)
        .bind(&record.fmo)
        .bind(&record.basin)
        .bind(&record.sub_basin)
        .bind(&record.area)
        .bind(d1)
        .bind(d2)
        .bind(d3)
        .bind(d4)
        .bind(d5)
        .bind(&record.aap)
        .bind(record.fetched_at)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_station_observation(&self, record: &StationObservation) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO station_observation (
                station_id, call_sign, district, state, station_name, observed_at,
                temperature_c, dew_point_c, relative_humidity, wind_direction_deg, wind_speed,
                mslp_hpa, min_temperature_c, max_temperature_c, latitude, longitude,
                nebulosity, weather_code, rainfall_selector, rainfall_mm
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
            "#,
        )
        .bind(&record.station_id)
        .bind(&record.call_sign)
        .bind(&record.district)
        .bind(&record.state)
        .bind(&record.station_name)
        .bind(record.observed_at)
        .bind(record.temperature_c)
        .bind(record.dew_point_c)
        .bind(record.relative_humidity)
        .bind(record.wind_direction_deg)
        .bind(record.wind_speed)
        .bind(record.mslp_hpa)
        .bind(record.min_temperature_c)
        .bind(record.max_temperature_c)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.nebulosity)
        .bind(&record.weather_code)
        .bind(&record.rainfall_selector)
        .bind(record.rainfall_mm)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_radar_snapshot(&self, record: &RadarSnapshot) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO radar_snapshot (location, captured_at, max_dbz, bearing_deg, range_km)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&record.location)
        .bind(record.captured_at)
        .bind(record.max_dbz)
        .bind(record.bearing_deg)
        .bind(record.range_km)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn insert_api_call(&self, log: &ApiCallLog) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_call_log (endpoint, bytes, status, requested_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&log.endpoint)
        .bind(log.bytes)
        .bind(i32::from(log.status))
        .bind(log.requested_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn latest_bulletin(&self, location: &str) -> AppResult<Option<Stored<BulletinRecord>>> {
        let row = sqlx::query_as::<_, BulletinRow>(
            r#"
            SELECT id, location, raw_payload_id, issued_at, forecast
            FROM bulletin
            WHERE location = $1
            ORDER BY issued_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn latest_district_warning(
        &self,
        location: &str,
    ) -> AppResult<Option<Stored<DistrictWarningRecord>>> {
        let row = sqlx::query_as::<_, DistrictWarningRow>(
            r#"
            SELECT id, location, issued_at,
                   day1_text, day2_text, day3_text, day4_text, day5_text,
                   day1_color, day2_color, day3_color, day4_color, day5_color
            FROM district_warning
            WHERE location = $1
            ORDER BY issued_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn latest_radar_snapshot(
        &self,
        location: &str,
    ) -> AppResult<Option<Stored<RadarSnapshot>>> {
        let row = sqlx::query_as::<_, RadarRow>(
            r#"
            SELECT id, location, captured_at, max_dbz, bearing_deg, range_km
            FROM radar_snapshot
            WHERE location = $1
            ORDER BY captured_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn latest_nowcast(&self, location: &str) -> AppResult<Option<Stored<NowcastRecord>>> {
        let row = sqlx::query_as::<_, NowcastRow>(
            r#"
            SELECT id, location, captured_at, lead_minutes, pop, intensity_mm_per_hr
            FROM nowcast
            WHERE location = $1
            ORDER BY captured_at DESC, lead_minutes ASC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn nowcast_pop_1h(&self, location: &str) -> AppResult<Option<f64>> {
        let pop: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT pop
            FROM nowcast
            WHERE location = $1
              AND lead_minutes <= $2
              AND captured_at = (SELECT MAX(captured_at) FROM nowcast WHERE location = $1)
            ORDER BY lead_minutes DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .bind(POP_1H_MAX_LEAD_MINUTES)
        .fetch_optional(&self.db)
        .await?;

        Ok(pop)
    }

    async fn nowcast_slice(&self, location: &str) -> AppResult<Vec<Stored<NowcastRecord>>> {
        let rows = sqlx::query_as::<_, NowcastRow>(
            r#"
            SELECT id, location, captured_at, lead_minutes, pop, intensity_mm_per_hr
            FROM nowcast
            WHERE location = $1
              AND lead_minutes <= $2
              AND captured_at = (SELECT MAX(captured_at) FROM nowcast WHERE location = $1)
            ORDER BY lead_minutes ASC, id ASC
            "#,
        )
        .bind(location)
        .bind(NOWCAST_SLICE_MAX_LEAD_MINUTES)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn category_flags(&self, nowcast_id: i64) -> AppResult<HashMap<i32, i16>> {
        let rows: Vec<(i32, i16)> = sqlx::query_as(
            r#"
            SELECT category, value
            FROM nowcast_category
            WHERE nowcast_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(nowcast_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn latest_nowcast_categories(&self, location: &str) -> AppResult<HashMap<i32, i16>> {
        let rows: Vec<(i32, i16)> = sqlx::query_as(
            r#"
            SELECT category, value
            FROM nowcast_category
            WHERE nowcast_id = (
                SELECT n.id
                FROM nowcast n
                WHERE n.location = $1
                  AND EXISTS (SELECT 1 FROM nowcast_category c WHERE c.nowcast_id = n.id)
                ORDER BY n.captured_at DESC, n.id DESC
                LIMIT 1
            )
            ORDER BY id ASC
            "#,
        )
        .bind(location)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn latest_river_basin(
        &self,
        basin_id: i32,
    ) -> AppResult<Vec<Stored<RiverBasinForecast>>> {
        let rows = sqlx::query_as::<_, RiverBasinRow>(
            r#"
            SELECT id, basin_id, date, fmo, basin, sub_basin, area,
                   day1, day2, day3, day4, day5, aap, fetched_at
            FROM river_basin_forecast
            WHERE basin_id = $1
              AND fetched_at = (SELECT MAX(fetched_at) FROM river_basin_forecast WHERE basin_id = $1)
            ORDER BY id ASC
            "#,
        )
        .bind(basin_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn latest_station_observation(
        &self,
        station_id: &str,
    ) -> AppResult<Option<Stored<StationObservation>>> {
        let row = sqlx::query_as::<_, StationRow>(
            r#"
            SELECT id, station_id, call_sign, district, state, station_name, observed_at,
                   temperature_c, dew_point_c, relative_humidity, wind_direction_deg, wind_speed,
                   mslp_hpa, min_temperature_c, max_temperature_c, latitude, longitude,
                   nebulosity, weather_code, rainfall_selector, rainfall_mm
            FROM station_observation
            WHERE station_id = $1
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(station_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
