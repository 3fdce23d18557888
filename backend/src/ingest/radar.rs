//! Doppler radar reflectivity adapter
//!
//! Fetches the radar composite for a location (primary site first, then the
//! fallbacks) and reduces it to the strongest echo near the site.

use std::sync::Arc;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use shared::{FeedKind, Location, RadarSnapshot};

use super::pipeline::{FeedFormat, IngestPipeline, RawRef};
use super::FeedAdapter;
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// Reflectivity color scale, ascending dBZ
pub const DBZ_SCALE: [([u8; 3], f64); 6] = [
    ([0, 0, 255], 25.0),
    ([0, 255, 0], 35.0),
    ([255, 255, 0], 45.0),
    ([255, 0, 0], 55.0),
    ([128, 0, 128], 65.0),
    ([255, 255, 255], 70.0),
];

/// Decoded radar image
pub struct RadarImage {
    pub format: ImageFormat,
    pub pixels: RgbaImage,
}

/// Strongest echo found in the scanned disc
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectivityPeak {
    pub max_dbz: f64,
    pub bearing_deg: Option<f64>,
    pub range_km: Option<f64>,
}

pub struct RadarAdapter {
    pipeline: Arc<IngestPipeline>,
    location: Location,
    url_template: String,
    image_range_km: f64,
    analysis_radius_km: f64,
}

impl RadarAdapter {
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        location: Location,
        url_template: String,
        image_range_km: f64,
        analysis_radius_km: f64,
    ) -> Self {
        Self {
            pipeline,
            location,
            url_template,
            image_range_km,
            analysis_radius_km,
        }
    }

    fn candidate_urls(&self) -> Vec<String> {
        self.location
            .radar_codes
            .iter()
            .map(|code| self.url_template.replace("{code}", code))
            .collect()
    }
}

#[async_trait]
impl FeedAdapter for RadarAdapter {
    fn name(&self) -> String {
        format!("{}:{}", FeedKind::Radar, self.location.name)
    }

    fn feed(&self) -> FeedKind {
        FeedKind::Radar
    }

    async fn fetch(&self) -> AppResult<usize> {
        let urls = self.candidate_urls();
        if urls.is_empty() {
            return Err(AppError::MissingConfig(format!(
                "no radar codes for {}",
                self.location.name
            )));
        }
        self.pipeline
            .ingest_first(self, &urls, &self.location.name)
            .await
    }
}

#[async_trait]
impl FeedFormat for RadarAdapter {
    type Decoded = RadarImage;
    type Record = RadarSnapshot;

    fn feed(&self) -> FeedKind {
        FeedKind::Radar
    }

    fn location(&self) -> Option<&str> {
        Some(&self.location.name)
    }

    fn archive_extension(&self, decoded: &RadarImage) -> Option<&'static str> {
        Some(match decoded.format {
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Jpeg => "jpg",
            _ => "img",
        })
    }

    fn decode(&self, body: &[u8]) -> AppResult<RadarImage> {
        let format = image::guess_format(body)
            .map_err(|e| AppError::Decode(format!("radar image format: {}", e)))?;
        let pixels = image::load_from_memory_with_format(body, format)
            .map_err(|e| AppError::Decode(format!("radar image: {}", e)))?
            .to_rgba8();
        if pixels.width() < 2 || pixels.height() < 2 {
            return Err(AppError::Decode(format!(
                "radar image too small: {}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(RadarImage { format, pixels })
    }

    async fn transform(&self, image: RadarImage, raw: RawRef) -> AppResult<Vec<RadarSnapshot>> {
        let peak = analyze_reflectivity(&image.pixels, self.image_range_km, self.analysis_radius_km);
        tracing::debug!(
            location = %self.location.name,
            max_dbz = peak.max_dbz,
            "Radar image analyzed"
        );
        Ok(vec![RadarSnapshot {
            location: self.location.name.clone(),
            captured_at: raw.fetched_at,
            max_dbz: peak.max_dbz,
            bearing_deg: peak.bearing_deg,
            range_km: peak.range_km,
        }])
    }

    async fn persist(&self, repo: &dyn Repository, records: Vec<RadarSnapshot>) -> AppResult<usize> {
        for record in &records {
            repo.insert_radar_snapshot(record).await?;
        }
        Ok(records.len())
    }
}

/// dBZ of the nearest scale color by RGB distance; ties keep the earlier entry
pub fn classify_pixel(rgb: [u8; 3]) -> f64 {
    let mut best_distance = f64::MAX;
    let mut best_dbz = 0.0;
    for (color, dbz) in DBZ_SCALE {
        let distance = color
            .iter()
            .zip(rgb.iter())
            .map(|(a, b)| (f64::from(*a) - f64::from(*b)).powi(2))
            .sum::<f64>()
            .sqrt();
        if distance < best_distance {
            best_distance = distance;
            best_dbz = dbz;
        }
    }
    best_dbz
}

/// Scan the disc of `radius_km` around the image centre.
///
/// Half the image width spans `range_km`. Pixels are visited row-major from
/// the top-left of the bounding square and the first pixel reaching the
/// maximum wins. Fully transparent pixels carry no echo and are skipped.
pub fn analyze_reflectivity(pixels: &RgbaImage, range_km: f64, radius_km: f64) -> ReflectivityPeak {
    let (width, height) = pixels.dimensions();
    let cx = i64::from(width / 2);
    let cy = i64::from(height / 2);
    let km_per_px = range_km / (width / 2).max(1) as f64;
    let radius_px = if km_per_px > 0.0 {
        (radius_km / km_per_px) as i64
    } else {
        0
    };

    let mut peak = ReflectivityPeak {
        max_dbz: 0.0,
        bearing_deg: None,
        range_km: None,
    };

    for y in (cy - radius_px)..=(cy + radius_px) {
        for x in (cx - radius_px)..=(cx + radius_px) {
            if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                continue;
            }
            let (dx, dy) = ((x - cx) as f64, (y - cy) as f64);
            let distance_px = (dx * dx + dy * dy).sqrt();
            if distance_px > radius_px as f64 {
                continue;
            }

            let [r, g, b, a] = pixels.get_pixel(x as u32, y as u32).0;
            if a == 0 {
                continue;
            }

            let dbz = classify_pixel([r, g, b]);
            if peak.bearing_deg.is_none() || dbz > peak.max_dbz {
                // image y grows downwards, north is up
                let bearing = dx.atan2(-dy).to_degrees().rem_euclid(360.0);
                peak = ReflectivityPeak {
                    max_dbz: dbz,
                    bearing_deg: Some(bearing),
                    range_km: Some(distance_px * km_per_px),
                };
            }
        }
    }

    peak
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn blank(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, TRANSPARENT)
    }

    #[test]
    fn test_scale_colors_classify_exactly() {
        for (color, dbz) in DBZ_SCALE {
            assert_eq!(classify_pixel(color), dbz);
        }
    }

    #[test]
    fn test_nearest_color_wins() {
        assert_eq!(classify_pixel([250, 10, 5]), 55.0);
        assert_eq!(classify_pixel([240, 240, 30]), 45.0);
        assert_eq!(classify_pixel([0, 0, 0]), 65.0);
    }

    #[test]
    fn test_ties_resolve_to_lower_entry() {
        // equidistant from blue and green
        assert_eq!(classify_pixel([0, 128, 128]), 25.0);
    }

    #[test]
    fn test_strongest_echo_bearing_and_range() {
        // 100px wide: 250km / 50px = 5 km per px, 40km radius = 8 px
        let mut img = blank(100);
        img.put_pixel(50, 46, Rgba([0, 255, 0, 255])); // 4px north, 35 dBZ
        img.put_pixel(56, 50, Rgba([255, 0, 0, 255])); // 6px east, 55 dBZ
        img.put_pixel(50, 70, Rgba([255, 255, 255, 255])); // outside radius

        let peak = analyze_reflectivity(&img, 250.0, 40.0);
        assert_eq!(peak.max_dbz, 55.0);
        assert!((peak.bearing_deg.unwrap() - 90.0).abs() < 1e-9);
        assert!((peak.range_km.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_pixel_at_max_wins() {
        let mut img = blank(100);
        img.put_pixel(50, 47, Rgba([255, 0, 0, 255])); // north, scanned first
        img.put_pixel(47, 50, Rgba([255, 0, 0, 255])); // west

        let peak = analyze_reflectivity(&img, 250.0, 40.0);
        assert_eq!(peak.max_dbz, 55.0);
        assert!(peak.bearing_deg.unwrap().abs() < 1e-9);
        assert!((peak.range_km.unwrap() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_transparent_image_has_no_echo() {
        let peak = analyze_reflectivity(&blank(64), 250.0, 40.0);
        assert_eq!(peak.max_dbz, 0.0);
        assert_eq!(peak.bearing_deg, None);
        assert_eq!(peak.range_km, None);
    }

    #[test]
    fn test_bearing_southwest() {
        let mut img = blank(100);
        img.put_pixel(46, 54, Rgba([128, 0, 128, 255]));
        let peak = analyze_reflectivity(&img, 250.0, 40.0);
        assert_eq!(peak.max_dbz, 65.0);
        assert!((peak.bearing_deg.unwrap() - 225.0).abs() < 1e-9);
    }
}
