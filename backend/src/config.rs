//! Configuration management for the Weatherboy backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with WEATHERBOY_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{default_locations, Location, LocationRegistry};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Read API server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Upstream feed endpoints
    pub feeds: FeedsConfig,

    /// Bulletin text extraction and summarization
    pub bulletin: BulletinConfig,

    /// Ingestion scheduler
    pub scheduler: SchedulerConfig,

    /// Raw document archive
    pub storage: StorageConfig,

    /// Optional override of the built-in location table
    #[serde(default)]
    pub locations: Option<Vec<Location>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct FeedsConfig {
    #[validate(url)]
    pub district_warning_url: String,

    #[validate(url)]
    pub district_nowcast_url: String,

    #[validate(url)]
    pub river_basin_url: String,

    #[validate(url)]
    pub station_url: String,

    /// Base URL the location's document source is appended to
    #[validate(url)]
    pub bulletin_base_url: String,

    /// Radar image URL, `{code}` is replaced by the radar site code
    pub radar_url_template: String,

    /// Stepped point nowcast endpoint; the feed is disabled when unset
    #[serde(default)]
    pub stepped_nowcast_url: Option<String>,

    /// Station ids polled by the observation feed
    #[serde(default = "default_station_ids")]
    pub station_ids: Vec<String>,

    /// Per-request timeout
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Ground range covered by half the radar image width
    #[validate(range(min = 1.0))]
    pub radar_image_range_km: f64,

    /// Radius around the radar site that is scanned for echoes
    #[validate(range(min = 1.0))]
    pub radar_analysis_radius_km: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BulletinConfig {
    /// OpenAI-compatible chat completions endpoint
    pub summarizer_endpoint: String,

    /// API key for the summarizer
    #[serde(default)]
    pub summarizer_api_key: String,

    /// Model name sent with each request
    pub summarizer_model: String,

    /// Path of the `pdftotext` binary
    pub pdftotext_path: String,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct SchedulerConfig {
    /// Run the ingestion jobs in this process
    pub enabled: bool,

    /// Upper bound of the random offset applied before each scheduled run
    #[validate(range(max = 300))]
    pub jitter_secs: u64,

    /// Skip a trigger while the previous run of the same job is in flight
    pub skip_if_busy: bool,

    /// Run every job once at startup
    pub run_on_startup: bool,

    /// How long shutdown waits for in-flight runs
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory for archived bulletin documents and radar images
    pub data_dir: String,
}

fn default_station_ids() -> Vec<String> {
    vec!["NDL".to_string()]
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("WEATHERBOY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default(
                "feeds.district_warning_url",
                "https://mausam.imd.gov.in/api/warnings_district_api.php",
            )?
            .set_default(
                "feeds.district_nowcast_url",
                "https://mausam.imd.gov.in/api/nowcast_district_api.php",
            )?
            .set_default(
                "feeds.river_basin_url",
                "https://mausam.imd.gov.in/api/basin_qpf_api.php",
            )?
            .set_default("feeds.station_url", "https://city.imd.gov.in/api/aws_data_api.php")?
            .set_default("feeds.bulletin_base_url", "https://mausam.imd.gov.in")?
            .set_default(
                "feeds.radar_url_template",
                "https://mausam.imd.gov.in/Radar/caz_{code}.gif",
            )?
            .set_default("feeds.request_timeout_secs", 60)?
            .set_default("feeds.radar_image_range_km", 250.0)?
            .set_default("feeds.radar_analysis_radius_km", 40.0)?
            .set_default(
                "bulletin.summarizer_endpoint",
                "https://api.openai.com/v1/chat/completions",
            )?
            .set_default("bulletin.summarizer_model", "gpt-3.5-turbo")?
            .set_default("bulletin.pdftotext_path", "pdftotext")?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.jitter_secs", 30)?
            .set_default("scheduler.skip_if_busy", true)?
            .set_default("scheduler.run_on_startup", true)?
            .set_default("scheduler.shutdown_grace_secs", 20)?
            .set_default("storage.data_dir", "data")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WEATHERBOY_ prefix)
            .add_source(
                Environment::with_prefix("WEATHERBOY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("feeds.station_ids")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feeds
            .validate()
            .map_err(|e| ConfigError::Message(format!("feeds: {}", e)))?;
        self.scheduler
            .validate()
            .map_err(|e| ConfigError::Message(format!("scheduler: {}", e)))?;
        if !self.feeds.radar_url_template.contains("{code}") {
            return Err(ConfigError::Message(
                "feeds.radar_url_template must contain {code}".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the location registry, preferring the configured table
    pub fn location_registry(&self) -> Result<LocationRegistry, ConfigError> {
        let locations = self.locations.clone().unwrap_or_else(default_locations);
        LocationRegistry::new(locations).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}
