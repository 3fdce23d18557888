//! District-wise 5-day warning adapter

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use shared::{
    DistrictWarningRecord, FeedKind, FieldError, Location, WarningColor, FEED_DATE_FORMAT,
};

use super::json::{decode_rows, lenient_string};
use super::pipeline::{FeedFormat, IngestPipeline, RawRef};
use super::{with_id, FeedAdapter};
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// One row of the district warning API
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictWarningRow {
    #[serde(rename = "Obj_id", default, deserialize_with = "lenient_string")]
    pub obj_id: String,
    #[serde(rename = "Date", default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "UTC", default, deserialize_with = "lenient_string")]
    pub utc: String,
    #[serde(rename = "District", default, deserialize_with = "lenient_string")]
    pub district: String,
    #[serde(rename = "Day_1", default, deserialize_with = "lenient_string")]
    pub day_1: String,
    #[serde(rename = "Day_2", default, deserialize_with = "lenient_string")]
    pub day_2: String,
    #[serde(rename = "Day_3", default, deserialize_with = "lenient_string")]
    pub day_3: String,
    #[serde(rename = "Day_4", default, deserialize_with = "lenient_string")]
    pub day_4: String,
    #[serde(rename = "Day_5", default, deserialize_with = "lenient_string")]
    pub day_5: String,
    #[serde(rename = "Day1_Color", default, deserialize_with = "lenient_string")]
    pub day1_color: String,
    #[serde(rename = "Day2_Color", default, deserialize_with = "lenient_string")]
    pub day2_color: String,
    #[serde(rename = "Day3_Color", default, deserialize_with = "lenient_string")]
    pub day3_color: String,
    #[serde(rename = "Day4_Color", default, deserialize_with = "lenient_string")]
    pub day4_color: String,
    #[serde(rename = "Day5_Color", default, deserialize_with = "lenient_string")]
    pub day5_color: String,
}

pub struct DistrictWarningAdapter {
    pipeline: Arc<IngestPipeline>,
    location: Location,
    base_url: String,
}

impl DistrictWarningAdapter {
    pub fn new(pipeline: Arc<IngestPipeline>, location: Location, base_url: String) -> Self {
        Self {
            pipeline,
            location,
            base_url,
        }
    }
}

#[async_trait]
impl FeedAdapter for DistrictWarningAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::DistrictWarning, self.location.name)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::DistrictWarning
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
impl FeedFormat for DistrictWarningAdapter {
    type Decoded = Vec<DistrictWarningRow>;
    type Record = DistrictWarningRecord;

    fn feed(&self) -> FeedKind {
        FeedKind::DistrictWarning
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location.name)
    }

    fn decode(&self, body: &[u8]) -> AppResult<Vec<DistrictWarningRow>> {
        decode_rows(FeedKind::DistrictWarning.as_str(), body)
    }

    async fn transform(
        &self,
        rows: Vec<DistrictWarningRow>,
        _raw: RawRef,
    ) -> AppResult<Vec<DistrictWarningRecord>> {
        // One object per district
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Decode("district warning payload is empty".to_string()))?;
        Ok(vec![normalize_warning(&self.location.name, row)?])
    }

    async fn persist(
        &self,
        repo: &dyn Repository,
        records: Vec<DistrictWarningRecord>,
    ) -> AppResult<usize> {
        for record in &records {
            repo.insert_district_warning(record).await?;
        }
        Ok(records.len())
    }
}

/// Issue time of a warning. The `UTC` column is already in UTC.
fn parse_issued_at(date: &str, time: &str) -> Result<DateTime<Utc>, FieldError> {
    let combined = format!("{} {}", date.trim(), time.trim());
    let layout = format!("{} %H:%M:%S", FEED_DATE_FORMAT);
    NaiveDateTime::parse_from_str(&combined, &layout)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| FieldError::new("UTC", &combined, e.to_string()))
}

pub fn normalize_warning(location: &str, row: DistrictWarningRow) -> AppResult<DistrictWarningRecord> {
    let issued_at = parse_issued_at(&row.date, &row.utc)?;
    Ok(DistrictWarningRecord {
        location: location.to_string(),
        issued_at,
        colors: [
            WarningColor::parse_lenient(&row.day1_color),
            WarningColor::parse_lenient(&row.day2_color),
            WarningColor::parse_lenient(&row.day3_color),
            WarningColor::parse_lenient(&row.day4_color),
            WarningColor::parse_lenient(&row.day5_color),
        ],
        warnings: [row.day_1, row.day_2, row.day_3, row.day_4, row.day_5],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[{
        "Obj_id": "244", "Date": "2024-07-15", "UTC": "08:30:00", "District": "Vadodara",
        "Day_1": "Heavy Rain", "Day_2": "Thunderstorm & Lightning", "Day_3": "No warning",
        "Day_4": "", "Day_5": "",
        "Day1_Color": "ORANGE", "Day2_Color": "Yellow", "Day3_Color": "4", "Day4_Color": "", "Day5_Color": "blue"
    }]"#;

    #[test]
    fn test_normalize_sample() {
        let rows: Vec<DistrictWarningRow> = decode_rows("district_warning", SAMPLE.as_bytes()).unwrap();
        let record = normalize_warning("vadodara", rows[0].clone()).unwrap();
        assert_eq!(record.issued_at.to_rfc3339(), "2024-07-15T08:30:00+00:00");
        assert_eq!(record.day_text(1), Some("Heavy Rain"));
        assert_eq!(
            record.colors,
            [
                WarningColor::Orange,
                WarningColor::Yellow,
                WarningColor::None,
                WarningColor::None,
                WarningColor::None
            ]
        );
    }

    #[test]
    fn test_missing_issue_time_is_field_error() {
        let mut rows: Vec<DistrictWarningRow> =
            decode_rows("district_warning", SAMPLE.as_bytes()).unwrap();
        rows[0].utc.clear();
        let err = normalize_warning("vadodara", rows.remove(0)).unwrap_err();
        assert!(matches!(err, AppError::FieldParse(_)));
    }
}
