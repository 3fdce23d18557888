//! River basin quantitative precipitation forecast adapter

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use shared::{
    parse_date_field, parse_i64_field, FeedKind, FieldError, Location, RiverBasinForecast,
};

use super::json::{decode_rows, lenient_string};
use super::pipeline::{FeedFormat, IngestPipeline, RawRef};
use super::{with_id, FeedAdapter};
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// One row of the basin QPF API
#[derive(Debug, Clone, Deserialize)]
pub struct RiverBasinRow {
    #[serde(rename = "Obj_Id", default, deserialize_with = "lenient_string")]
    pub obj_id: String,
    #[serde(rename = "Date", default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "FMO", default, deserialize_with = "lenient_string")]
    pub fmo: String,
    #[serde(rename = "Basin", default, deserialize_with = "lenient_string")]
    pub basin: String,
    #[serde(rename = "SubBasin", default, deserialize_with = "lenient_string")]
    pub sub_basin: String,
    #[serde(rename = "Area", default, deserialize_with = "lenient_string")]
    pub area: String,
    #[serde(rename = "Day1", default, deserialize_with = "lenient_string")]
    pub day1: String,
    #[serde(rename = "Day2", default, deserialize_with = "lenient_string")]
    pub day2: String,
    #[serde(rename = "Day3", default, deserialize_with = "lenient_string")]
    pub day3: String,
    #[serde(rename = "Day4", default, deserialize_with = "lenient_string")]
    pub day4: String,
    #[serde(rename = "Day5", default, deserialize_with = "lenient_string")]
    pub day5: String,
    #[serde(rename = "AAP", default, deserialize_with = "lenient_string")]
    pub aap: String,
}

pub struct RiverBasinAdapter {
    pipeline: Arc<IngestPipeline>,
    location: Location,
    base_url: String,
}

impl RiverBasinAdapter {
    pub fn new(pipeline: Arc<IngestPipeline>, location: Location, base_url: String) -> Self {
        Self {
            pipeline,
            location,
            base_url,
        }
    }
}

#[async_trait]
impl FeedAdapter for RiverBasinAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::RiverBasin, self.location.name)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::RiverBasin
    }

    async fn fetch(&self) -> AppResult<usize> {
        let basin_id = self.location.river_basin_id.ok_or_else(|| {
            AppError::MissingConfig(format!("no river basin id for {}", self.location.name))
        })?;
        let url = with_id(&self.base_url, basin_id);
        self.pipeline.ingest(self, &url, &self.location.name).await
    }
}

#[async_trait]
impl FeedFormat for RiverBasinAdapter {
    type Decoded = Vec<RiverBasinRow>;
    type Record = RiverBasinForecast;

    fn feed(&self) -> FeedKind {
        FeedKind::RiverBasin
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location.name)
    }

    fn decode(&self, body: &[u8]) -> AppResult<Vec<RiverBasinRow>> {
        decode_rows(FeedKind::RiverBasin.as_str(), body)
    }

    async fn transform(&self, rows: Vec<RiverBasinRow>, raw: RawRef) -> AppResult<Vec<RiverBasinForecast>> {
        rows.into_iter()
            .map(|row| normalize_basin(row, raw))
            .collect()
    }

    async fn persist(
        &self,
        repo: &dyn Repository,
        records: Vec<RiverBasinForecast>,
    ) -> AppResult<usize> {
        for record in &records {
            repo.insert_river_basin(record).await?;
        }
        Ok(records.len())
    }
}

pub fn normalize_basin(row: RiverBasinRow, raw: RawRef) -> AppResult<RiverBasinForecast> {
    let obj_id = parse_i64_field("Obj_Id", &row.obj_id)?;
    let basin_id = i32::try_from(obj_id)
        .map_err(|_| FieldError::new("Obj_Id", &row.obj_id, "out of range"))?;
    let date = parse_date_field("Date", &row.date)?;

    Ok(RiverBasinForecast {
        basin_id,
        date,
        fmo: row.fmo,
        basin: row.basin,
        sub_basin: row.sub_basin,
        area: row.area,
        days: [row.day1, row.day2, row.day3, row.day4, row.day5],
        aap: row.aap,
        fetched_at: raw.fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn raw() -> RawRef {
        RawRef {
            id: 1,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalizes_every_row() {
        let body = br#"[
            {"Obj_Id":"1","Date":"2024-07-15","FMO":"Ahmedabad","Basin":"Mahi","SubBasin":"Lower Mahi",
             "Area":"Vadodara","Day1":"26-50","Day2":"11-25","Day3":"1-10","Day4":"0","Day5":"0","AAP":"38"},
            {"Obj_Id":1,"Date":"2024-07-15","FMO":"Ahmedabad","Basin":"Mahi","SubBasin":"Upper Mahi",
             "Area":"Banswara","Day1":"11-25","Day2":"1-10","Day3":"0","Day4":"0","Day5":"0","AAP":"12"}
        ]"#;
        let rows: Vec<RiverBasinRow> = decode_rows("river_basin", body).unwrap();
        let records: Vec<RiverBasinForecast> = rows
            .into_iter()
            .map(|row| normalize_basin(row, raw()))
            .collect::<AppResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sub_basin, "Upper Mahi");
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(records[0].days[0], "26-50");
    }

    #[test]
    fn test_bad_date_rejects_row() {
        let row = RiverBasinRow {
            obj_id: "1".into(),
            date: "15-07-2024".into(),
            fmo: String::new(),
            basin: String::new(),
            sub_basin: String::new(),
            area: String::new(),
            day1: String::new(),
            day2: String::new(),
            day3: String::new(),
            day4: String::new(),
            day5: String::new(),
            aap: String::new(),
        };
        assert!(matches!(normalize_basin(row, raw()), Err(AppError::FieldParse(_))));
    }
}
