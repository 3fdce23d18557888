//! Source adapters
//!
//! One adapter per feed and target. Each adapter builds its request from the
//! location (or a fixed station id) and hands the response to the shared
//! [`IngestPipeline`] together with its [`FeedFormat`].

pub mod bulletin;
pub mod district_warning;
pub mod json;
pub mod nowcast;
pub mod pipeline;
pub mod radar;
pub mod river_basin;
pub mod station;

use std::sync::Arc;

use async_trait::async_trait;
use shared::{FeedKind, LocationRegistry};

use crate::config::FeedsConfig;
use crate::error::AppResult;
use crate::external::{Summarizer, TextExtractor};

pub use bulletin::BulletinAdapter;
pub use district_warning::DistrictWarningAdapter;
pub use nowcast::{DistrictNowcastAdapter, SteppedNowcastAdapter};
pub use pipeline::{FeedFormat, IngestPipeline, RawRef};
pub use radar::RadarAdapter;
pub use river_basin::RiverBasinAdapter;
pub use station::StationAdapter;

/// A schedulable unit of ingestion bound to one target
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    /// Unique job name, e.g. `district_nowcast:vadodara`
    fn name(&self) -> String;

    fn feed(&self) -> FeedKind;

    /// Run one ingestion, returning the number of normalized records written
    async fn fetch(&self) -> AppResult<usize>;
}

/// Build the adapter set for every location in the registry.
///
/// Id-keyed feeds are only scheduled for locations that carry the id.
pub fn build_adapters(
    registry: &LocationRegistry,
    feeds: &FeedsConfig,
    pipeline: Arc<IngestPipeline>,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
) -> Vec<Arc<dyn FeedAdapter>> {
    let mut adapters: Vec<Arc<dyn FeedAdapter>> = Vec::new();

    for location in registry.iter() {
        if location.document_source.is_some() {
            adapters.push(Arc::new(BulletinAdapter::new(
                pipeline.clone(),
                location.clone(),
                feeds.bulletin_base_url.clone(),
                extractor.clone(),
                summarizer.clone(),
            )));
        }

        if location.district_id.is_some() {
            adapters.push(Arc::new(DistrictWarningAdapter::new(
                pipeline.clone(),
                location.clone(),
                feeds.district_warning_url.clone(),
            )));
            adapters.push(Arc::new(DistrictNowcastAdapter::new(
                pipeline.clone(),
                location.clone(),
                feeds.district_nowcast_url.clone(),
            )));
        } else {
            tracing::info!(location = %location.name, "No district id, skipping district feeds");
        }

        if location.river_basin_id.is_some() {
            adapters.push(Arc::new(RiverBasinAdapter::new(
                pipeline.clone(),
                location.clone(),
                feeds.river_basin_url.clone(),
            )));
        }

        if let Some(base_url) = &feeds.stepped_nowcast_url {
            adapters.push(Arc::new(SteppedNowcastAdapter::new(
                pipeline.clone(),
                location.clone(),
                base_url.clone(),
            )));
        }

        if !location.radar_codes.is_empty() {
            adapters.push(Arc::new(RadarAdapter::new(
                pipeline.clone(),
                location.clone(),
                feeds.radar_url_template.clone(),
                feeds.radar_image_range_km,
                feeds.radar_analysis_radius_km,
            )));
        }
    }

    for station_id in &feeds.station_ids {
        adapters.push(Arc::new(StationAdapter::new(
            pipeline.clone(),
            station_id.clone(),
            feeds.station_url.clone(),
        )));
    }

    adapters
}

/// Append an `id` query parameter to a feed endpoint
pub(crate) fn with_id(base_url: &str, id: impl std::fmt::Display) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}id={}", base_url, separator, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id() {
        assert_eq!(
            with_id("https://mausam.imd.gov.in/api/nowcast_district_api.php", 244),
            "https://mausam.imd.gov.in/api/nowcast_district_api.php?id=244"
        );
        assert_eq!(with_id("http://x/api?fmt=json", "NDL"), "http://x/api?fmt=json&id=NDL");
    }
}
