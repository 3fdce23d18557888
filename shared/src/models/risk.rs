//! Risk scoring output

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordinal flood / heavy-rain risk level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl RiskLevel {
    pub const RED_THRESHOLD: f64 = 0.8;
    pub const ORANGE_THRESHOLD: f64 = 0.5;
    pub const YELLOW_THRESHOLD: f64 = 0.3;

    /// Threshold a final score, evaluated top-down
    pub fn from_score(score: f64) -> Self {
        if score >= Self::RED_THRESHOLD {
            RiskLevel::Red
        } else if score >= Self::ORANGE_THRESHOLD {
            RiskLevel::Orange
        } else if score >= Self::YELLOW_THRESHOLD {
            RiskLevel::Yellow
        } else {
            RiskLevel::Green
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "GREEN",
            RiskLevel::Yellow => "YELLOW",
            RiskLevel::Orange => "ORANGE",
            RiskLevel::Red => "RED",
        }
    }
}

/// Computed risk for one location, never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskResult {
    pub location: String,
    pub level: RiskLevel,
    pub score: f64,
    /// Signal name to its contribution
    pub breakdown: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Green);
        assert_eq!(RiskLevel::from_score(0.29), RiskLevel::Green);
        assert_eq!(RiskLevel::from_score(0.3), RiskLevel::Yellow);
        assert_eq!(RiskLevel::from_score(0.5), RiskLevel::Orange);
        assert_eq!(RiskLevel::from_score(0.79), RiskLevel::Orange);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::Red);
        assert_eq!(RiskLevel::from_score(1.8), RiskLevel::Red);
    }

    #[test]
    fn test_level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Orange).unwrap(), "\"ORANGE\"");
    }
}
