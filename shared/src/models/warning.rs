//! District-wise 5-day color coded warnings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Warning color for one forecast day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WarningColor {
    #[default]
    None,
    Yellow,
    Orange,
    Red,
}

impl WarningColor {
    /// Parse a feed color value. Only color names count, in any case;
    /// numeric codes and everything else are `None`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yellow" => WarningColor::Yellow,
            "orange" => WarningColor::Orange,
            "red" => WarningColor::Red,
            _ => WarningColor::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningColor::None => "none",
            WarningColor::Yellow => "yellow",
            WarningColor::Orange => "orange",
            WarningColor::Red => "red",
        }
    }
}

/// Number of forecast days carried by a district warning
pub const WARNING_DAYS: usize = 5;

/// 5-day district warning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistrictWarningRecord {
    pub location: String,
    pub issued_at: DateTime<Utc>,
    /// Warning text for day 1..=5
    pub warnings: [String; WARNING_DAYS],
    /// Warning color for day 1..=5
    pub colors: [WarningColor; WARNING_DAYS],
}

impl DistrictWarningRecord {
    /// Warning text for a 1-based day
    pub fn day_text(&self, day: usize) -> Option<&str> {
        day.checked_sub(1)
            .and_then(|i| self.warnings.get(i))
            .map(String::as_str)
    }

    /// Warning color for a 1-based day
    pub fn day_color(&self, day: usize) -> WarningColor {
        day.checked_sub(1)
            .and_then(|i| self.colors.get(i).copied())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_names_case_insensitive() {
        assert_eq!(WarningColor::parse_lenient("Orange"), WarningColor::Orange);
        assert_eq!(WarningColor::parse_lenient(" RED "), WarningColor::Red);
        assert_eq!(WarningColor::parse_lenient("yellow"), WarningColor::Yellow);
    }

    #[test]
    fn test_numeric_codes_are_none() {
        for raw in ["1", "2", "3", "4"] {
            assert_eq!(WarningColor::parse_lenient(raw), WarningColor::None);
        }
    }

    #[test]
    fn test_unknown_colors_are_none() {
        for raw in ["", "green", "magenta", "5", "#ff0000"] {
            assert_eq!(WarningColor::parse_lenient(raw), WarningColor::None);
        }
    }

    #[test]
    fn test_day_accessors_are_one_based() {
        let record = DistrictWarningRecord {
            location: "vadodara".into(),
            issued_at: Utc::now(),
            warnings: [
                "Heavy Rain".into(),
                "Thunderstorm".into(),
                String::new(),
                String::new(),
                String::new(),
            ],
            colors: [
                WarningColor::Orange,
                WarningColor::Yellow,
                WarningColor::None,
                WarningColor::None,
                WarningColor::None,
            ],
        };
        assert_eq!(record.day_text(1), Some("Heavy Rain"));
        assert_eq!(record.day_color(2), WarningColor::Yellow);
        assert_eq!(record.day_text(0), None);
        assert_eq!(record.day_color(9), WarningColor::None);
    }
}
