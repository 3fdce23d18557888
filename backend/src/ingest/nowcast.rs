//! Precipitation nowcast adapters
//!
//! The district nowcast yields one current reading plus its category flags.
//! The stepped point nowcast yields one reading per lead step.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use shared::{
    intensity_from_bucket, parse_i64_field, parse_ist_datetime, pop_from_color, FeedKind,
    FieldError, Location, NowcastCategoryFlag, NowcastRecord, NOWCAST_CATEGORY_COUNT,
};

use super::json::{decode_rows, lenient_string};
use super::pipeline::{FeedFormat, IngestPipeline, RawRef};
use super::{with_id, FeedAdapter};
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// Step used when the stepped nowcast omits `step_minutes`
pub const DEFAULT_STEP_MINUTES: i32 = 5;

/// Largest step accepted from the stepped nowcast
pub const MAX_STEP_MINUTES: i32 = 60;

/// A nowcast reading with the category values to attach once it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NowcastBatchItem {
    pub record: NowcastRecord,
    pub categories: Vec<(i32, i16)>,
}

/// One row of the district nowcast API
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictNowcastRow {
    #[serde(rename = "Obj_id", default, deserialize_with = "lenient_string")]
    pub obj_id: String,
    #[serde(rename = "Date", default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub toi: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vupto: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub precip_intensity: String,
    /// `cat1` .. `cat19` and anything else the feed adds
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl DistrictNowcastRow {
    /// Category values that parse into range; everything else is skipped
    pub fn categories(&self) -> Vec<(i32, i16)> {
        let mut categories: Vec<(i32, i16)> = (1..=NOWCAST_CATEGORY_COUNT)
            .filter_map(|index| {
                let value = self.extra.get(&format!("cat{}", index))?;
                let parsed = match value {
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    Value::Number(n) => n.as_i64(),
                    _ => None,
                }?;
                i16::try_from(parsed).ok().map(|v| (index, v))
            })
            .collect();
        categories.sort_unstable();
        categories
    }
}

pub struct DistrictNowcastAdapter {
    pipeline: Arc<IngestPipeline>,
    location: Location,
    base_url: String,
}

impl DistrictNowcastAdapter {
    pub fn new(pipeline: Arc<IngestPipeline>, location: Location, base_url: String) -> Self {
        Self {
            pipeline,
            location,
            base_url,
        }
    }
}

#[async_trait]
impl FeedAdapter for DistrictNowcastAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::DistrictNowcast, self.location.name)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::DistrictNowcast
    }

    async fn fetch(&self) -> AppResult<usize> {
        let district_id = self.location.district_id.ok_or_else(|| {
            AppError::MissingConfig(format!("no district id for {}", self.location.name))
        })?;
        let url = with_id(&self.base_url, district_id);
        self.pipeline.ingest(self, &url, &self.location.name).await
    }
}

#[async_trait]
impl FeedFormat for DistrictNowcastAdapter {
    type Decoded = Vec<DistrictNowcastRow>;
    type Record = NowcastBatchItem;

    fn feed(&self) -> FeedKind {
        FeedKind::DistrictNowcast
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location.name)
    }

    fn decode(&self, body: &[u8]) -> AppResult<Vec<DistrictNowcastRow>> {
        decode_rows(FeedKind::DistrictNowcast.as_str(), body)
    }

    async fn transform(
        &self,
        rows: Vec<DistrictNowcastRow>,
        _raw: RawRef,
    ) -> AppResult<Vec<NowcastBatchItem>> {
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Decode("district nowcast payload is empty".to_string()))?;
        Ok(vec![normalize_district_nowcast(&self.location.name, &row)?])
    }

    async fn persist(&self, repo: &dyn Repository, items: Vec<NowcastBatchItem>) -> AppResult<usize> {
        persist_nowcasts(repo, items).await
    }
}

pub fn normalize_district_nowcast(
    location: &str,
    row: &DistrictNowcastRow,
) -> AppResult<NowcastBatchItem> {
    let color = parse_i64_field("color", &row.color)?;
    let bucket = parse_i64_field("precip_intensity", &row.precip_intensity)?;
    let captured_at = parse_ist_datetime("toi", &row.date, &row.toi, "%H%M")?;

    Ok(NowcastBatchItem {
        record: NowcastRecord {
            location: location.to_string(),
            captured_at,
            lead_minutes: 0,
            pop: pop_from_color(color),
            intensity_mm_per_hr: intensity_from_bucket(bucket),
        },
        categories: row.categories(),
    })
}

/// Stepped point nowcast response
#[derive(Debug, Clone, Deserialize)]
pub struct SteppedNowcast {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub step_minutes: Option<i32>,
    #[serde(default)]
    pub pop: Vec<f64>,
    #[serde(default)]
    pub precip_intensity: Vec<i64>,
}

pub struct SteppedNowcastAdapter {
    pipeline: Arc<IngestPipeline>,
    location: Location,
    base_url: String,
}

impl SteppedNowcastAdapter {
    pub fn new(pipeline: Arc<IngestPipeline>, location: Location, base_url: String) -> Self {
        Self {
            pipeline,
            location,
            base_url,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/{:.2},{:.2}",
            self.base_url.trim_end_matches('/'),
            self.location.latitude,
            self.location.longitude
        )
    }
}

#[async_trait]
impl FeedAdapter for SteppedNowcastAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::SteppedNowcast, self.location.name)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::SteppedNowcast
    }

    async fn fetch(&self) -> AppResult<usize> {
        let url = self.url();
        self.pipeline.ingest(self, &url, &self.location.name).await
    }
}

#[async_trait]
impl FeedFormat for SteppedNowcastAdapter {
    type Decoded = SteppedNowcast;
    type Record = NowcastBatchItem;

    fn feed(&self) -> FeedKind {
        FeedKind::SteppedNowcast
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location.name)
    }

    fn decode(&self, body: &[u8]) -> AppResult<SteppedNowcast> {
        let decoded: SteppedNowcast = serde_json::from_slice(body)
            .map_err(|e| AppError::Decode(format!("stepped nowcast payload: {}", e)))?;
        if decoded.pop.is_empty() || decoded.precip_intensity.is_empty() {
            return Err(AppError::Decode("stepped nowcast has no steps".to_string()));
        }
        Ok(decoded)
    }

    async fn transform(&self, decoded: SteppedNowcast, _raw: RawRef) -> AppResult<Vec<NowcastBatchItem>> {
        normalize_stepped_nowcast(&self.location.name, &decoded)
    }

    async fn persist(&self, repo: &dyn Repository, items: Vec<NowcastBatchItem>) -> AppResult<usize> {
        persist_nowcasts(repo, items).await
    }
}

/// One reading per step, paired up to the shorter of the two series
pub fn normalize_stepped_nowcast(
    location: &str,
    decoded: &SteppedNowcast,
) -> AppResult<Vec<NowcastBatchItem>> {
    let step = match decoded.step_minutes {
        Some(step) if step > MAX_STEP_MINUTES => {
            return Err(AppError::from(FieldError::new(
                "step_minutes",
                &step.to_string(),
                format!("step larger than {} minutes", MAX_STEP_MINUTES),
            )));
        }
        Some(step) if step > 0 => step,
        _ => DEFAULT_STEP_MINUTES,
    };

    decoded
        .pop
        .iter()
        .zip(&decoded.precip_intensity)
        .enumerate()
        .map(|(index, (&pop, &bucket))| {
            if !(0.0..=1.0).contains(&pop) {
                return Err(AppError::from(FieldError::new(
                    &format!("pop[{}]", index),
                    &pop.to_string(),
                    "probability outside 0..=1",
                )));
            }
            let lead_minutes = i32::try_from(index)
                .ok()
                .and_then(|index| index.checked_mul(step))
                .ok_or_else(|| {
                    FieldError::new("step_minutes", &step.to_string(), "lead time overflows")
                })?;
            Ok(NowcastBatchItem {
                record: NowcastRecord {
                    location: location.to_string(),
                    captured_at: decoded.start_time,
                    lead_minutes,
                    pop,
                    intensity_mm_per_hr: intensity_from_bucket(bucket),
                },
                categories: Vec::new(),
            })
        })
        .collect()
}

/// Write each reading, then its flags against the id it was given
async fn persist_nowcasts(repo: &dyn Repository, items: Vec<NowcastBatchItem>) -> AppResult<usize> {
    for item in &items {
        let nowcast_id = repo.insert_nowcast(&item.record).await?;
        for &(category, value) in &item.categories {
            repo.insert_nowcast_category(&NowcastCategoryFlag {
                nowcast_id,
                category,
                value,
            })
            .await?;
        }
    }
    Ok(items.len())
}
