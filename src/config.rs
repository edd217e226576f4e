//! Application configuration.
//!
//! Loaded from TOML, then selectively overridden from the environment so
//! API keys can stay out of config files. Every section is optional and
//! falls back to its `Default`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::gemini::GeminiConfig;
use crate::geocode::{GeocodeCacheConfig, NominatimConfig};
use crate::openrouteservice::OpenRouteServiceConfig;
use crate::osrm::OsrmConfig;
use crate::resolver::DEFAULT_MAX_ENDPOINT_OFFSET_KM;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Provider paths starting or ending farther than this are rejected.
    pub max_endpoint_offset_km: f64,
    /// Overall budget for one resolution across all providers.
    pub deadline_secs: u64,
    /// Skip OSRM entirely (e.g. when only a paid provider is available).
    pub osrm_enabled: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_endpoint_offset_km: DEFAULT_MAX_ENDPOINT_OFFSET_KM,
            deadline_secs: 25,
            osrm_enabled: true,
        }
    }
}

impl RoutingConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransitConfig {
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub routing: RoutingConfig,
    pub osrm: OsrmConfig,
    pub openrouteservice: OpenRouteServiceConfig,
    pub nominatim: NominatimConfig,
    pub geocode_cache: GeocodeCacheConfig,
    pub gemini: GeminiConfig,
    pub transit: TransitConfig,
    /// Threads resolving waypoint labels in the background.
    pub label_threads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            osrm: OsrmConfig::default(),
            openrouteservice: OpenRouteServiceConfig::default(),
            nominatim: NominatimConfig::default(),
            geocode_cache: GeocodeCacheConfig::default(),
            gemini: GeminiConfig::default(),
            transit: TransitConfig::default(),
            label_threads: 2,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&toml)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("ORS_API_KEY") {
            self.openrouteservice.api_key = Some(SecretString::from(key));
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            self.gemini.api_key = Some(SecretString::from(key));
        }
        if let Some(url) = var("OSRM_BASE_URL") {
            self.osrm.base_url = url;
        }
        if let Some(url) = var("NOMINATIM_BASE_URL") {
            self.nominatim.base_url = url;
        }
        if let Some(path) = var("TRANSIT_CATALOG") {
            self.transit.catalog_path = Some(PathBuf::from(path));
        }
    }

    pub fn geocode_ttl(&self) -> Duration {
        Duration::from_secs(self.geocode_cache.ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.routing.max_endpoint_offset_km > 0.0) {
            return Err(ConfigError::Invalid(
                "routing.max_endpoint_offset_km must be positive".to_string(),
            ));
        }
        let timeouts = [
            ("osrm", self.osrm.timeout_secs),
            ("openrouteservice", self.openrouteservice.timeout_secs),
            ("nominatim", self.nominatim.timeout_secs),
            ("gemini", self.gemini.timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid(format!(
                "{name}.timeout_secs must be at least 1"
            )));
        }
        Ok(())
    }
}
