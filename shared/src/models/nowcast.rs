//! Short-range precipitation nowcasts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// mm/hr for each IMD precipitation intensity bucket
pub const INTENSITY_TABLE_MM_PER_HR: [f64; 10] = [0.0, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];

/// Number of category columns published by the district nowcast
pub const NOWCAST_CATEGORY_COUNT: i32 = 19;

/// Short-range precipitation outlook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NowcastRecord {
    pub location: String,
    pub captured_at: DateTime<Utc>,
    /// Lead time in minutes, 0 for the current reading
    pub lead_minutes: i32,
    /// Probability of precipitation, 0..=1
    pub pop: f64,
    pub intensity_mm_per_hr: f64,
}

/// Categorical indicator attached to a nowcast row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowcastCategoryFlag {
    pub nowcast_id: i64,
    pub category: i32,
    pub value: i16,
}

/// Map a precipitation intensity bucket to mm/hr, clamping out-of-range buckets
pub fn intensity_from_bucket(bucket: i64) -> f64 {
    let last = INTENSITY_TABLE_MM_PER_HR.len() - 1;
    let index = bucket.clamp(0, last as i64) as usize;
    INTENSITY_TABLE_MM_PER_HR[index]
}

/// Map an IMD nowcast color code to an approximate probability of precipitation
pub fn pop_from_color(code: i64) -> f64 {
    match code {
        1 => 0.3,
        2 => 0.6,
        3 => 0.8,
        4 => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_intensity_table_entries() {
        for (bucket, expected) in INTENSITY_TABLE_MM_PER_HR.iter().enumerate() {
            assert_eq!(intensity_from_bucket(bucket as i64), *expected);
        }
    }

    #[test]
    fn test_intensity_table_is_monotonic() {
        assert!(INTENSITY_TABLE_MM_PER_HR.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_pop_codes() {
        assert_eq!(pop_from_color(1), 0.3);
        assert_eq!(pop_from_color(2), 0.6);
        assert_eq!(pop_from_color(3), 0.8);
        assert_eq!(pop_from_color(4), 1.0);
    }

    proptest! {
        #[test]
        fn prop_negative_buckets_map_to_zero(bucket in i64::MIN..0) {
            prop_assert_eq!(intensity_from_bucket(bucket), 0.0);
        }

        #[test]
        fn prop_large_buckets_map_to_last(bucket in 10i64..i64::MAX) {
            prop_assert_eq!(intensity_from_bucket(bucket), 64.0);
        }

        #[test]
        fn prop_unknown_colors_have_zero_pop(code in any::<i64>().prop_filter("known code", |c| !(1..=4).contains(c))) {
            prop_assert_eq!(pop_from_color(code), 0.0);
        }
    }
}
