//! Flood / heavy-rain risk scoring
//!
//! Reads the latest record of each signal for a location and folds them into
//! a score. Missing data and lookup failures contribute nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::{RiskLevel, RiskResult, WarningColor};

use crate::error::AppResult;
use crate::repository::Repository;

pub const BULLETIN_KEYWORD: &str = "heavy";
pub const BULLETIN_WEIGHT: f64 = 0.4;

pub const RADAR_MIN_DBZ: f64 = 45.0;
pub const RADAR_MAX_RANGE_KM: f64 = 40.0;
pub const RADAR_WEIGHT: f64 = 0.4;

pub const NOWCAST_POP_THRESHOLD: f64 = 0.7;
pub const NOWCAST_POP_WEIGHT: f64 = 0.2;

pub const NOWCAST_INTENSITY_THRESHOLD: f64 = 4.0;
pub const NOWCAST_INTENSITY_WEIGHT: f64 = 0.8;

/// Categories worth [`SEVERE_CATEGORY_WEIGHT`] each when raised
pub const SEVERE_CATEGORIES: [i32; 2] = [2, 3];
pub const SEVERE_CATEGORY_WEIGHT: f64 = 0.1;

/// Categories that force the score to [`ALERT_SCORE`]
pub const ALERT_CATEGORIES: [i32; 3] = [13, 14, 19];
pub const ALERT_SCORE: f64 = 0.9;

pub const RED_WARNING_FLOOR: f64 = 0.8;
pub const ORANGE_WARNING_FLOOR: f64 = 0.5;

pub const WARNING_TEXT_KEYWORD: &str = "heavy rain";
pub const WARNING_TEXT_DAY1_WEIGHT: f64 = 0.8;
pub const WARNING_TEXT_DAY2_WEIGHT: f64 = 0.5;

/// Computes [`RiskResult`]s from repository reads
#[derive(Clone)]
pub struct ScoringEngine {
    repo: Arc<dyn Repository>,
}

impl ScoringEngine {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Score a location. Never fails; no data at all yields GREEN.
    pub async fn score(&self, location: &str) -> RiskResult {
        let mut score = 0.0;
        let mut breakdown = BTreeMap::new();

        if let Some(bulletin) = found("bulletin", location, self.repo.latest_bulletin(location).await) {
            if bulletin.record.text.to_lowercase().contains(BULLETIN_KEYWORD) {
                score += BULLETIN_WEIGHT;
                breakdown.insert("bulletin".to_string(), BULLETIN_WEIGHT);
            }
        }

        if let Some(radar) = found("radar", location, self.repo.latest_radar_snapshot(location).await) {
            let near = radar
                .record
                .range_km
                .map_or(true, |range| range <= RADAR_MAX_RANGE_KM);
            if radar.record.max_dbz >= RADAR_MIN_DBZ && near {
                score += RADAR_WEIGHT;
                breakdown.insert("radar".to_string(), RADAR_WEIGHT);
            }
        }

        if let Some(pop) = found("nowcast_pop", location, self.repo.nowcast_pop_1h(location).await) {
            if pop >= NOWCAST_POP_THRESHOLD {
                score += NOWCAST_POP_WEIGHT;
                breakdown.insert("nowcast_pop".to_string(), NOWCAST_POP_WEIGHT);
            }
        }

        if let Some(nowcast) = found("nowcast", location, self.repo.latest_nowcast(location).await) {
            if nowcast.record.intensity_mm_per_hr >= NOWCAST_INTENSITY_THRESHOLD {
                score += NOWCAST_INTENSITY_WEIGHT;
                breakdown.insert("nowcast_intensity".to_string(), NOWCAST_INTENSITY_WEIGHT);
            }
        }

        let flags = match self.repo.latest_nowcast_categories(location).await {
            Ok(flags) => flags,
            Err(e) => {
                tracing::debug!(location = %location, signal = "categories", "Signal lookup failed: {}", e);
                Default::default()
            }
        };
        let raised = |category: &i32| flags.get(category).is_some_and(|value| *value > 0);

        if ALERT_CATEGORIES.iter().any(raised) {
            // replaces everything accumulated so far
            score = ALERT_SCORE;
            breakdown.insert("nowcast_alert".to_string(), ALERT_SCORE);
        } else {
            let severe = SEVERE_CATEGORIES.iter().filter(|c| raised(*c)).count() as f64
                * SEVERE_CATEGORY_WEIGHT;
            if severe > 0.0 {
                score += severe;
                breakdown.insert("categories".to_string(), severe);
            }
        }

        if let Some(warning) = found(
            "district_warning",
            location,
            self.repo.latest_district_warning(location).await,
        ) {
            let floor = match warning.record.day_color(1) {
                WarningColor::Red => Some(RED_WARNING_FLOOR),
                WarningColor::Orange => Some(ORANGE_WARNING_FLOOR),
                _ => None,
            };
            if let Some(floor) = floor {
                score = f64::max(score, floor);
                breakdown.insert("district_warning".to_string(), floor);
            }

            for (day, weight) in [(1, WARNING_TEXT_DAY1_WEIGHT), (2, WARNING_TEXT_DAY2_WEIGHT)] {
                let mentions_heavy_rain = warning
                    .record
                    .day_text(day)
                    .is_some_and(|text| text.to_lowercase().contains(WARNING_TEXT_KEYWORD));
                if mentions_heavy_rain {
                    score += weight;
                    breakdown.insert(format!("warning_text_day{}", day), weight);
                }
            }
        }

        let result = RiskResult {
            location: location.to_string(),
            level: RiskLevel::from_score(score),
            score,
            breakdown,
        };
        tracing::debug!(location = %location, score = result.score, level = result.level.as_str(), "Risk scored");
        result
    }
}

fn found<T>(signal: &str, location: &str, lookup: AppResult<Option<T>>) -> Option<T> {
    match lookup {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(location = %location, signal = signal, "Signal lookup failed: {}", e);
            None
        }
    }
}
