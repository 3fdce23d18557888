//! Monitored locations and their source-specific identifiers

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// A monitored place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Location {
    /// Unique key, lowercase (e.g. "vadodara")
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// IMD district id used by the warning and nowcast feeds
    #[serde(default)]
    pub district_id: Option<u32>,

    /// IMD river basin id used by the basin QPF feed
    #[serde(default)]
    pub river_basin_id: Option<u32>,

    /// Path of the state bulletin document relative to the bulletin base URL
    #[serde(default)]
    pub document_source: Option<String>,

    /// Radar site codes, primary first
    #[serde(default)]
    pub radar_codes: Vec<String>,
}

impl Location {
    pub fn primary_radar(&self) -> Option<&str> {
        self.radar_codes.first().map(String::as_str)
    }
}

/// Built-in location table
pub fn default_locations() -> Vec<Location> {
    vec![
        Location {
            name: "vadodara".to_string(),
            latitude: 22.30,
            longitude: 73.20,
            district_id: Some(244),
            river_basin_id: Some(1),
            document_source: Some("ahmedabad/mcdata/state.pdf".to_string()),
            radar_codes: vec!["baroda".to_string(), "ahmedabad".to_string()],
        },
        Location {
            name: "mumbai".to_string(),
            latitude: 19.08,
            longitude: 72.88,
            district_id: None,
            river_basin_id: None,
            document_source: Some("mumbai/mcdata/state.pdf".to_string()),
            radar_codes: vec!["mumbai".to_string()],
        },
        Location {
            name: "thane".to_string(),
            latitude: 19.22,
            longitude: 72.97,
            district_id: None,
            river_basin_id: None,
            document_source: Some("mumbai/mcdata/state.pdf".to_string()),
            radar_codes: vec!["mumbai".to_string()],
        },
        Location {
            name: "pune".to_string(),
            latitude: 18.52,
            longitude: 73.85,
            district_id: None,
            river_basin_id: None,
            document_source: Some("mumbai/mcdata/state.pdf".to_string()),
            radar_codes: vec!["mumbai".to_string()],
        },
    ]
}

/// Errors raised while building the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid location {name:?}: {errors}")]
    Invalid {
        name: String,
        errors: ValidationErrors,
    },

    #[error("duplicate location {0:?}")]
    Duplicate(String),
}

/// Static table of monitored locations, consulted by the feed adapters
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    /// Validate and index a location table
    pub fn new(locations: Vec<Location>) -> Result<Self, RegistryError> {
        let mut seen: Vec<String> = Vec::with_capacity(locations.len());
        for location in &locations {
            location.validate().map_err(|errors| RegistryError::Invalid {
                name: location.name.clone(),
                errors,
            })?;
            let key = location.name.to_lowercase();
            if seen.contains(&key) {
                return Err(RegistryError::Duplicate(location.name.clone()));
            }
            seen.push(key);
        }
        Ok(Self { locations })
    }

    /// Registry over the built-in table
    pub fn builtin() -> Self {
        Self {
            locations: default_locations(),
        }
    }

    /// Look up a location by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = LocationRegistry::new(default_locations()).unwrap();
        assert_eq!(registry.len(), 4);
        let vadodara = registry.get("Vadodara").unwrap();
        assert_eq!(vadodara.district_id, Some(244));
        assert_eq!(vadodara.primary_radar(), Some("baroda"));
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let mut locations = default_locations();
        locations[0].latitude = 123.0;
        assert!(matches!(
            LocationRegistry::new(locations),
            Err(RegistryError::Invalid { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut locations = default_locations();
        locations[1].name = "VADODARA".to_string();
        assert!(matches!(
            LocationRegistry::new(locations),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_unknown_location() {
        assert!(LocationRegistry::builtin().get("surat").is_none());
    }
}
