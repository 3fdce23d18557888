//! Common types used across the platform

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use serde::{Deserialize, Serialize};

/// Upstream feed types ingested by the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Bulletin,
    DistrictWarning,
    DistrictNowcast,
    SteppedNowcast,
    RiverBasin,
    StationObservation,
    Radar,
}

impl FeedKind {
    pub const ALL: [FeedKind; 7] = [
        FeedKind::Bulletin,
        FeedKind::DistrictWarning,
        FeedKind::DistrictNowcast,
        FeedKind::SteppedNowcast,
        FeedKind::RiverBasin,
        FeedKind::StationObservation,
        FeedKind::Radar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Bulletin => "bulletin",
            FeedKind::DistrictWarning => "district_warning",
            FeedKind::DistrictNowcast => "district_nowcast",
            FeedKind::SteppedNowcast => "stepped_nowcast",
            FeedKind::RiverBasin => "river_basin",
            FeedKind::StationObservation => "station_observation",
            FeedKind::Radar => "radar",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted record together with its row id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stored<T> {
    pub id: i64,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Stored<T> {
    pub fn new(id: i64, record: T) -> Self {
        Self { id, record }
    }
}

/// Interpret an India-local wall-clock time as an absolute instant.
///
/// Asia/Kolkata has no DST transitions, so every local time maps to exactly
/// one instant; `None` is only returned for times chrono cannot represent.
pub fn ist_to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    Kolkata
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_feed_kind_round_trips_through_str() {
        for kind in FeedKind::ALL {
            assert_eq!(FeedKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FeedKind::parse("satellite"), None);
    }

    #[test]
    fn test_ist_offset_applied() {
        let local = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let utc = ist_to_utc(local).unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-07-01T13:00:00+00:00");
    }
}
