//! Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::errors::FleetError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub refresh: RefreshConfig,
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the REST backend, demo mode only when unset
    pub base_url: Option<String>,
    /// File holding the bearer token
    pub token_path: PathBuf,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub interval: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    /// Latitude of the reference center, decimal degrees
    pub center_lat: f64,
    /// Longitude of the reference center, decimal degrees
    pub center_lon: f64,
    /// Vessels turn back when a move would take them past this distance
    pub bound_radius_km: f64,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub tick_interval: Duration,
    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WeatherConfig {
    pub provider_url: Option<String>,
    pub api_key: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("backend.token_path", ".fleet-tracker/token")?
            .set_default("backend.timeout", 10)?
            .set_default("refresh.interval", 30)?
            .set_default("simulator.center_lat", 14.6928)?
            .set_default("simulator.center_lon", -17.4467)?
            .set_default("simulator.bound_radius_km", 5.0)?
            .set_default("simulator.tick_interval", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("FLEETTRACKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), FleetError> {
        self.backend.validate()?;
        self.refresh.validate()?;
        self.simulator.validate()?;
        Ok(())
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), FleetError> {
        if let Some(url) = &self.base_url {
            if url.trim().is_empty() {
                return Err(FleetError::ConfigurationError {
                    message: "Backend base URL cannot be empty".to_string(),
                });
            }
        }
        if self.token_path.to_str().unwrap_or("").is_empty() {
            return Err(FleetError::ConfigurationError {
                message: "Token path cannot be empty".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(FleetError::ConfigurationError {
                message: "Backend timeout must be greater than zero".to_string(),
            });
        }
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory_exists(parent)?;
            }
        }
        Ok(())
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<(), FleetError> {
        if self.interval.is_zero() {
            return Err(FleetError::ConfigurationError {
                message: "Refresh interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), FleetError> {
        if !(-90.0..=90.0).contains(&self.center_lat) || !(-180.0..=180.0).contains(&self.center_lon)
        {
            return Err(FleetError::ConfigurationError {
                message: format!(
                    "Reference center ({}, {}) is out of range",
                    self.center_lat, self.center_lon
                ),
            });
        }
        if self.bound_radius_km <= 0.0 || !self.bound_radius_km.is_finite() {
            return Err(FleetError::ConfigurationError {
                message: "Bound radius must be a positive distance".to_string(),
            });
        }
        if self.tick_interval.is_zero() {
            return Err(FleetError::ConfigurationError {
                message: "Tick interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            center_lat: 14.6928,
            center_lon: -17.4467,
            bound_radius_km: 5.0,
            tick_interval: Duration::from_secs(30),
            seed: None,
        }
    }
}

fn ensure_directory_exists(dir: &Path) -> Result<(), FleetError> {
    if !dir.exists() {
        warn!("Token directory does not exist, attempting to create it");
        std::fs::create_dir_all(dir).map_err(|e| FleetError::ConfigurationError {
            message: format!("Could not create token directory: {}", e),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_load_config() {
        env::set_var("FLEETTRACKER__BACKEND__BASE_URL", "http://localhost:8000/api");
        env::set_var("FLEETTRACKER__BACKEND__TOKEN_PATH", "/tmp/fleet/token");
        env::set_var("FLEETTRACKER__REFRESH__INTERVAL", "15");
        env::set_var("FLEETTRACKER__SIMULATOR__BOUND_RADIUS_KM", "3.5");
        env::set_var("FLEETTRACKER__SIMULATOR__SEED", "42");

        let config = AppConfig::load().unwrap();
        assert_eq!(
            config.backend.base_url.as_deref(),
            Some("http://localhost:8000/api")
        );
        assert_eq!(config.backend.token_path, PathBuf::from("/tmp/fleet/token"));
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert_eq!(config.refresh.interval, Duration::from_secs(15));
        assert_eq!(config.simulator.bound_radius_km, 3.5);
        assert_eq!(config.simulator.tick_interval, Duration::from_secs(30));
        assert_eq!(config.simulator.seed, Some(42));
        assert!(config.weather.provider_url.is_none());
    }

    #[test]
    fn test_weather_section_is_optional() {
        let config: AppConfig = Config::builder()
            .set_override("backend.token_path", "token")
            .unwrap()
            .set_override("backend.timeout", 10)
            .unwrap()
            .set_override("refresh.interval", 30)
            .unwrap()
            .set_override("simulator.center_lat", 14.6928)
            .unwrap()
            .set_override("simulator.center_lon", -17.4467)
            .unwrap()
            .set_override("simulator.bound_radius_km", 5.0)
            .unwrap()
            .set_override("simulator.tick_interval", 30)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.weather.provider_url.is_none());
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_config_creates_token_dir() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("nested").join("token");
        let config = BackendConfig {
            base_url: None,
            token_path: token_path.clone(),
            timeout: Duration::from_secs(5),
        };

        assert!(config.validate().is_ok());
        assert!(token_path.parent().unwrap().exists());
    }

    #[test]
    fn test_backend_config_validate_empty_url() {
        let config = BackendConfig {
            base_url: Some("  ".to_string()),
            token_path: PathBuf::from("token"),
            timeout: Duration::from_secs(5),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_config_validate_zero_interval() {
        let config = RefreshConfig {
            interval: Duration::from_secs(0),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulator_config_validate() {
        assert!(SimulatorConfig::default().validate().is_ok());

        let config = SimulatorConfig {
            bound_radius_km: 0.0,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimulatorConfig {
            center_lat: 120.0,
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
