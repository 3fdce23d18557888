//! In-process repository backed by vectors
//!
//! Implements the same contracts as [`PgRepository`](super::PgRepository)
//! and exposes the stored rows for inspection.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{
    ApiCallLog, BulletinRecord, DistrictWarningRecord, NowcastCategoryFlag, NowcastRecord,
    RadarSnapshot, RawPayload, RiverBasinForecast, StationObservation, Stored,
};

use super::{Repository, NOWCAST_SLICE_MAX_LEAD_MINUTES, POP_1H_MAX_LEAD_MINUTES};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    next_id: i64,
    raw: Vec<Stored<RawPayload>>,
    bulletins: Vec<Stored<BulletinRecord>>,
    warnings: Vec<Stored<DistrictWarningRecord>>,
    nowcasts: Vec<Stored<NowcastRecord>>,
    categories: Vec<NowcastCategoryFlag>,
    river_basins: Vec<Stored<RiverBasinForecast>>,
    stations: Vec<Stored<StationObservation>>,
    radar: Vec<Stored<RadarSnapshot>>,
    api_calls: Vec<ApiCallLog>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    fail_writes: Mutex<bool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a persistence error
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn raw_payloads(&self) -> Vec<Stored<RawPayload>> {
        self.tables.lock().raw.clone()
    }

    pub fn bulletins(&self) -> Vec<Stored<BulletinRecord>> {
        self.tables.lock().bulletins.clone()
    }

    pub fn district_warnings(&self) -> Vec<Stored<DistrictWarningRecord>> {
        self.tables.lock().warnings.clone()
    }

    pub fn nowcasts(&self) -> Vec<Stored<NowcastRecord>> {
        self.tables.lock().nowcasts.clone()
    }

    pub fn nowcast_categories(&self) -> Vec<NowcastCategoryFlag> {
        self.tables.lock().categories.clone()
    }

    pub fn river_basins(&self) -> Vec<Stored<RiverBasinForecast>> {
        self.tables.lock().river_basins.clone()
    }

    pub fn station_observations(&self) -> Vec<Stored<StationObservation>> {
        self.tables.lock().stations.clone()
    }

    pub fn radar_snapshots(&self) -> Vec<Stored<RadarSnapshot>> {
        self.tables.lock().radar.clone()
    }

    pub fn api_calls(&self) -> Vec<ApiCallLog> {
        self.tables.lock().api_calls.clone()
    }

    fn check_writable(&self) -> AppResult<()> {
        if *self.fail_writes.lock() {
            return Err(AppError::Persistence("writes are disabled".to_string()));
        }
        Ok(())
    }

    fn insert<T: Clone>(
        &self,
        record: &T,
        table: impl FnOnce(&mut Tables) -> &mut Vec<Stored<T>>,
    ) -> AppResult<i64> {
        self.check_writable()?;
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        table(&mut *tables).push(Stored::new(id, record.clone()));
        Ok(id)
    }

    /// Rows of the newest capture for a location
    fn latest_capture(tables: &Tables, location: &str) -> Vec<Stored<NowcastRecord>> {
        let Some(captured_at) = tables
            .nowcasts
            .iter()
            .filter(|n| n.record.location == location)
            .map(|n| n.record.captured_at)
            .max()
        else {
            return Vec::new();
        };
        tables
            .nowcasts
            .iter()
            .filter(|n| n.record.location == location && n.record.captured_at == captured_at)
            .cloned()
            .collect()
    }
}

/// Newest row by `key`, later ids winning ties
fn latest_by<T: Clone, K: Ord>(
    rows: &[Stored<T>],
    matches: impl Fn(&T) -> bool,
    key: impl Fn(&T) -> K,
) -> Option<Stored<T>> {
    rows.iter()
        .filter(|row| matches(&row.record))
        .max_by(|a, b| key(&a.record).cmp(&key(&b.record)).then(a.id.cmp(&b.id)))
        .cloned()
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_raw(&self, payload: &RawPayload) -> AppResult<i64> {
        self.insert(payload, |t| &mut t.raw)
    }

    async fn insert_bulletin(&self, record: &BulletinRecord) -> AppResult<i64> {
        self.insert(record, |t| &mut t.bulletins)
    }

    async fn insert_district_warning(&self, record: &DistrictWarningRecord) -> AppResult<i64> {
        self.insert(record, |t| &mut t.warnings)
    }

    async fn insert_nowcast(&self, record: &NowcastRecord) -> AppResult<i64> {
        self.insert(record, |t| &mut t.nowcasts)
    }

    async fn insert_nowcast_category(&self, flag: &NowcastCategoryFlag) -> AppResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock();
        if !tables.nowcasts.iter().any(|n| n.id == flag.nowcast_id) {
            return Err(AppError::Persistence(format!(
                "nowcast {} does not exist",
                flag.nowcast_id
            )));
        }
        tables.categories.push(*flag);
        Ok(())
    }

    async fn insert_river_basin(&self, record: &RiverBasinForecast) -> AppResult<i64> {
        self.insert(record, |t| &mut t.river_basins)
    }

    async fn insert_station_observation(&self, record: &StationObservation) -> AppResult<i64> {
        self.insert(record, |t| &mut t.stations)
    }

    async fn insert_radar_snapshot(&self, record: &RadarSnapshot) -> AppResult<i64> {
        self.insert(record, |t| &mut t.radar)
    }

    async fn insert_api_call(&self, log: &ApiCallLog) -> AppResult<()> {
        self.check_writable()?;
        self.tables.lock().api_calls.push(log.clone());
        Ok(())
    }

    async fn latest_bulletin(&self, location: &str) -> AppResult<Option<Stored<BulletinRecord>>> {
        let tables = self.tables.lock();
        Ok(latest_by(
            &tables.bulletins,
            |b| b.location == location,
            |b| b.issued_at,
        ))
    }

    async fn latest_district_warning(
        &self,
        location: &str,
    ) -> AppResult<Option<Stored<DistrictWarningRecord>>> {
        let tables = self.tables.lock();
        Ok(latest_by(
            &tables.warnings,
            |w| w.location == location,
            |w| w.issued_at,
        ))
    }

    async fn latest_radar_snapshot(
        &self,
        location: &str,
    ) -> AppResult<Option<Stored<RadarSnapshot>>> {
        let tables = self.tables.lock();
        Ok(latest_by(
            &tables.radar,
            |r| r.location == location,
            |r| r.captured_at,
        ))
    }

    async fn latest_nowcast(&self, location: &str) -> AppResult<Option<Stored<NowcastRecord>>> {
        let tables = self.tables.lock();
        let capture = Self::latest_capture(&tables, location);
        Ok(capture
            .into_iter()
            .min_by(|a, b| {
                a.record
                    .lead_minutes
                    .cmp(&b.record.lead_minutes)
                    .then(b.id.cmp(&a.id))
            }))
    }

    async fn nowcast_pop_1h(&self, location: &str) -> AppResult<Option<f64>> {
        let tables = self.tables.lock();
        let capture = Self::latest_capture(&tables, location);
        Ok(capture
            .into_iter()
            .filter(|n| n.record.lead_minutes <= POP_1H_MAX_LEAD_MINUTES)
            .max_by(|a, b| {
                a.record
                    .lead_minutes
                    .cmp(&b.record.lead_minutes)
                    .then(a.id.cmp(&b.id))
            })
            .map(|n| n.record.pop))
    }

    async fn nowcast_slice(&self, location: &str) -> AppResult<Vec<Stored<NowcastRecord>>> {
        let tables = self.tables.lock();
        let mut slice: Vec<_> = Self::latest_capture(&tables, location)
            .into_iter()
            .filter(|n| n.record.lead_minutes <= NOWCAST_SLICE_MAX_LEAD_MINUTES)
            .collect();
        slice.sort_by_key(|n| (n.record.lead_minutes, n.id));
        Ok(slice)
    }

    async fn category_flags(&self, nowcast_id: i64) -> AppResult<HashMap<i32, i16>> {
        let tables = self.tables.lock();
        Ok(tables
            .categories
            .iter()
            .filter(|f| f.nowcast_id == nowcast_id)
            .map(|f| (f.category, f.value))
            .collect())
    }

    async fn latest_nowcast_categories(&self, location: &str) -> AppResult<HashMap<i32, i16>> {
        let tables = self.tables.lock();
        let Some(nowcast_id) = tables
            .nowcasts
            .iter()
            .filter(|n| n.record.location == location)
            .filter(|n| tables.categories.iter().any(|f| f.nowcast_id == n.id))
            .max_by_key(|n| (n.record.captured_at, n.id))
            .map(|n| n.id)
        else {
            return Ok(HashMap::new());
        };
        Ok(tables
            .categories
            .iter()
            .filter(|f| f.nowcast_id == nowcast_id)
            .map(|f| (f.category, f.value))
            .collect())
    }

    async fn latest_river_basin(
        &self,
        basin_id: i32,
    ) -> AppResult<Vec<Stored<RiverBasinForecast>>> {
        let tables = self.tables.lock();
        let Some(fetched_at) = tables
            .river_basins
            .iter()
            .filter(|r| r.record.basin_id == basin_id)
            .map(|r| r.record.fetched_at)
            .max()
        else {
            return Ok(Vec::new());
        };
        Ok(tables
            .river_basins
            .iter()
            .filter(|r| r.record.basin_id == basin_id && r.record.fetched_at == fetched_at)
            .cloned()
            .collect())
    }

    async fn latest_station_observation(
        &self,
        station_id: &str,
    ) -> AppResult<Option<Stored<StationObservation>>> {
        let tables = self.tables.lock();
        Ok(latest_by(
            &tables.stations,
            |s| s.station_id == station_id,
            |s| s.observed_at,
        ))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn nowcast(captured_offset_min: i64, lead: i32, pop: f64) -> NowcastRecord {
        NowcastRecord {
            location: "vadodara".into(),
            captured_at: Utc::now() - Duration::hours(1) + Duration::minutes(captured_offset_min),
            lead_minutes: lead,
            pop,
            intensity_mm_per_hr: 0.0,
        }
    }

    #[tokio::test]
    async fn test_pop_1h_uses_latest_capture_and_largest_lead() {
        let repo = MemoryRepository::new();
        let base = Utc::now();
        for (lead, pop) in [(0, 0.1), (30, 0.4), (60, 0.9), (75, 0.2)] {
            let mut record = nowcast(0, lead, pop);
            record.captured_at = base;
            repo.insert_nowcast(&record).await.unwrap();
        }
        let mut older = nowcast(0, 60, 0.99);
        older.captured_at = base - Duration::minutes(15);
        repo.insert_nowcast(&older).await.unwrap();

        assert_eq!(repo.nowcast_pop_1h("vadodara").await.unwrap(), Some(0.9));
        assert_eq!(repo.nowcast_pop_1h("mumbai").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_latest_nowcast_prefers_current_reading() {
        let repo = MemoryRepository::new();
        let base = Utc::now();
        for lead in [15, 0, 5] {
            let mut record = nowcast(0, lead, 0.5);
            record.captured_at = base;
            repo.insert_nowcast(&record).await.unwrap();
        }
        let latest = repo.latest_nowcast("vadodara").await.unwrap().unwrap();
        assert_eq!(latest.record.lead_minutes, 0);
    }

    #[tokio::test]
    async fn test_category_flags_require_existing_nowcast() {
        let repo = MemoryRepository::new();
        let flag = NowcastCategoryFlag {
            nowcast_id: 42,
            category: 2,
            value: 1,
        };
        assert!(repo.insert_nowcast_category(&flag).await.is_err());

        let id = repo.insert_nowcast(&nowcast(0, 0, 0.3)).await.unwrap();
        repo.insert_nowcast_category(&NowcastCategoryFlag { nowcast_id: id, ..flag })
            .await
            .unwrap();
        assert_eq!(repo.category_flags(id).await.unwrap().get(&2), Some(&1));
    }

    #[tokio::test]
    async fn test_latest_categories_skip_unflagged_captures() {
        let repo = MemoryRepository::new();
        assert!(repo.latest_nowcast_categories("vadodara").await.unwrap().is_empty());

        let older = repo.insert_nowcast(&nowcast(0, 0, 0.3)).await.unwrap();
        repo.insert_nowcast_category(&NowcastCategoryFlag {
            nowcast_id: older,
            category: 14,
            value: 0,
        })
        .await
        .unwrap();
        let district = repo.insert_nowcast(&nowcast(10, 0, 0.3)).await.unwrap();
        repo.insert_nowcast_category(&NowcastCategoryFlag {
            nowcast_id: district,
            category: 14,
            value: 1,
        })
        .await
        .unwrap();
        for lead in [0, 15, 30] {
            repo.insert_nowcast(&nowcast(20, lead, 0.5)).await.unwrap();
        }

        let flags = repo.latest_nowcast_categories("vadodara").await.unwrap();
        assert_eq!(flags.get(&14), Some(&1));
        assert!(repo.latest_nowcast_categories("mumbai").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slice_is_bounded_and_ordered() {
        let repo = MemoryRepository::new();
        let base = Utc::now();
        for lead in [240, 0, 245, 120] {
            let mut record = nowcast(0, lead, 0.5);
            record.captured_at = base;
            repo.insert_nowcast(&record).await.unwrap();
        }
        let leads: Vec<i32> = repo
            .nowcast_slice("vadodara")
            .await
            .unwrap()
            .iter()
            .map(|n| n.record.lead_minutes)
            .collect();
        assert_eq!(leads, vec![0, 120, 240]);
    }
}
