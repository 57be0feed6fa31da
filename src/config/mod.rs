//! Unified configuration for every stayfinder role.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (stayfinder.toml)
//! ```toml
//! port = 8080
//!
//! [tracing]
//! collector = "otel-collector:4317"
//!
//! [dependents]
//! geo = "geo:8080"
//! rate = "rate:8080"
//!
//! [query]
//! max_results = 5
//! max_radius_km = 10.0
//! ```
//!
//! Environment variables use the `STAYFINDER_` prefix with `__` between
//! sections, e.g. `STAYFINDER_TRACING__COLLECTOR=otel-collector:4317`.

mod defaults;

pub use defaults::*;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration shared by all roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StayConfig {
    /// Listen interface
    pub listen: IpAddr,
    /// Listen port
    pub port: u16,
    pub tracing: TracingConfig,
    /// Addresses of the roles this one may depend on
    pub dependents: DependentsConfig,
    pub data: DataConfig,
    pub query: QueryConfig,
    pub frontend: FrontendConfig,
    pub dial: DialConfig,
    pub log: LogConfig,
}

impl Default for StayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_IP
                .parse()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: DEFAULT_PORT,
            tracing: TracingConfig::default(),
            dependents: DependentsConfig::default(),
            data: DataConfig::default(),
            query: QueryConfig::default(),
            frontend: FrontendConfig::default(),
            dial: DialConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl StayConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - CLI overrides to apply on top
    pub fn load(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(StayConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with STAYFINDER_ prefix
        figment = figment.merge(Env::prefixed("STAYFINDER_").split("__"));

        // Layer 3: CLI overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: StayConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.query.max_results == 0 {
            return Err(ConfigError::Invalid(
                "query.max_results must be at least 1".to_string(),
            ));
        }
        if !(self.query.max_radius_km.is_finite() && self.query.max_radius_km > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "query.max_radius_km must be positive, got {}",
                self.query.max_radius_km
            )));
        }
        if self.tracing.flush_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tracing.flush_interval_ms must be positive".to_string(),
            ));
        }
        let origin = &self.frontend;
        if !(origin.origin_lat.is_finite() && (-90.0..=90.0).contains(&origin.origin_lat)) {
            return Err(ConfigError::Invalid(format!(
                "frontend.origin_lat must be within [-90, 90], got {}",
                origin.origin_lat
            )));
        }
        if !(origin.origin_lon.is_finite() && (-180.0..=180.0).contains(&origin.origin_lon)) {
            return Err(ConfigError::Invalid(format!(
                "frontend.origin_lon must be within [-180, 180], got {}",
                origin.origin_lon
            )));
        }
        Ok(())
    }
}

/// Span sampling and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// OTLP/gRPC endpoint of the span collector; spans are logged when unset
    pub collector: Option<String>,
    pub flush_interval_ms: u64,
    /// Sample root spans
    pub sampled: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            collector: None,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            sampled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DependentsConfig {
    pub geo: String,
    pub rate: String,
    pub profile: String,
    pub search: String,
}

impl Default for DependentsConfig {
    fn default() -> Self {
        Self {
            geo: DEFAULT_GEO_ADDR.to_string(),
            rate: DEFAULT_RATE_ADDR.to_string(),
            profile: DEFAULT_PROFILE_ADDR.to_string(),
            search: DEFAULT_SEARCH_ADDR.to_string(),
        }
    }
}

/// Bundled data files, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub geo: PathBuf,
    pub rates: PathBuf,
    pub hotels: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            geo: PathBuf::from(DEFAULT_GEO_DATA),
            rates: PathBuf::from(DEFAULT_RATES_DATA),
            hotels: PathBuf::from(DEFAULT_HOTELS_DATA),
        }
    }
}

/// Nearby-query policy of the geo role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub max_results: usize,
    pub max_radius_km: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            max_radius_km: DEFAULT_MAX_RADIUS_KM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub default_locale: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            origin_lat: DEFAULT_ORIGIN_LAT,
            origin_lon: DEFAULT_ORIGIN_LON,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialConfig {
    pub connect_timeout_ms: u64,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracing: Option<TracingOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependents: Option<DependentsOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependentsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
