/// Dashboard configuration loader - parses floodsense.toml
///
/// Separates the site location, archive endpoint, simulation defaults, and
/// file paths from code, so the service can be pointed at another town or a
/// different inventory without recompiling.

use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::infrastructure::DEFAULT_INFRASTRUCTURE_PATH;
use crate::model::GeoPoint;
use crate::rainfall::SimulationParams;

/// Default config file, relative to the project root.
pub const DEFAULT_CONFIG_PATH: &str = "floodsense.toml";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "FLOODSENSE_CONFIG";

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    #[serde(default)]
    pub rainfall: RainfallConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// The fixed town the dashboard monitors.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Timezone all timestamps are presented in.
    #[serde(default = "default_civil_timezone")]
    pub civil_timezone: Tz,
}

/// Weather archive endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RainfallConfig {
    pub archive_url: String,
    /// Timezone the archive is asked to report timestamps in.
    pub reporting_timezone: Tz,
    /// Trailing window for live fetches, in days.
    pub window_days: u32,
    pub request_timeout_secs: u64,
}

/// Defaults for simulated rainfall
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub days: u32,
    pub min_mm: f64,
    pub max_mm: f64,
}

/// Input and output file locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub infrastructure_path: String,
    pub report_path: String,
}

/// Configuration load failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_civil_timezone() -> Tz {
    chrono_tz::America::Chicago
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "College Station, TX".to_string(),
            latitude: 30.62798,
            longitude: -96.33441,
            civil_timezone: default_civil_timezone(),
        }
    }
}

impl Default for RainfallConfig {
    fn default() -> Self {
        Self {
            archive_url: crate::ingest::open_meteo::ARCHIVE_BASE_URL.to_string(),
            reporting_timezone: chrono_tz::UTC,
            window_days: 7,
            request_timeout_secs: 10,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 7,
            min_mm: 10.0,
            max_mm: 60.0,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            infrastructure_path: DEFAULT_INFRASTRUCTURE_PATH.to_string(),
            report_path: crate::report::DEFAULT_REPORT_FILE.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            rainfall: RainfallConfig::default(),
            simulation: SimulationConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn site_point(&self) -> GeoPoint {
        GeoPoint::new(self.site.latitude, self.site.longitude)
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            days: self.simulation.days,
            min_mm: self.simulation.min_mm,
            max_mm: self.simulation.max_mm,
        }
    }

    /// Checks ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.site.latitude) {
            return Err(ConfigError::Invalid(format!("site.latitude {} out of range", self.site.latitude)));
        }
        if !(-180.0..=180.0).contains(&self.site.longitude) {
            return Err(ConfigError::Invalid(format!("site.longitude {} out of range", self.site.longitude)));
        }
        if self.rainfall.window_days == 0 {
            return Err(ConfigError::Invalid("rainfall.window_days must be at least 1".to_string()));
        }
        if self.rainfall.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("rainfall.request_timeout_secs must be at least 1".to_string()));
        }
        self.simulation_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("simulation: {}", e)))?;
        Ok(())
    }
}

/// Parses and validates configuration from a TOML string.
pub fn parse_config(contents: &str, origin: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from an explicit path.
pub fn load_config_from<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;

    parse_config(&contents, &display)
}

/// Loads configuration from `$FLOODSENSE_CONFIG` or `floodsense.toml`.
///
/// A missing file falls back to the built-in College Station defaults; a
/// file that exists but is malformed is an error.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    if !Path::new(&path).exists() {
        log::warn!("{} not found; using built-in defaults", path);
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}
