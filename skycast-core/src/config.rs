use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::model::UnitSystem;
use crate::provider::{ClimateProviderId, KeyedService};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Unit system used when `--units` is not given.
    #[serde(default)]
    pub units: UnitSystem,

    /// Historical data source, e.g. "open-meteo" or "meteostat".
    pub climate_provider: Option<String>,

    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Configured climate provider, falling back to the keyless one.
    pub fn climate_provider_id(&self) -> Result<ClimateProviderId> {
        match self.climate_provider.as_deref() {
            Some(s) => ClimateProviderId::try_from(s),
            None => Ok(ClimateProviderId::default()),
        }
    }

    pub fn set_climate_provider(&mut self, id: ClimateProviderId) {
        self.climate_provider = Some(id.as_str().to_string());
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace the API key of a service.
    pub fn upsert_api_key(&mut self, service: KeyedService, api_key: String) {
        self.providers
            .insert(service.as_str().to_string(), ProviderConfig { api_key });
    }

    /// API key for a service. The environment variable wins over the file.
    pub fn api_key(&self, service: KeyedService) -> Option<String> {
        self.api_key_with_env(service, |var| std::env::var(var).ok())
    }

    /// Same as [`Config::api_key`] with the environment lookup supplied by the caller.
    pub fn api_key_with_env(
        &self,
        service: KeyedService,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        env(service.env_var())
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.stored_api_key(service).map(str::to_owned))
    }

    /// API key from the config file only.
    pub fn stored_api_key(&self, service: KeyedService) -> Option<&str> {
        self.providers
            .get(service.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_metric_and_open_meteo() {
        let cfg = Config::default();

        assert_eq!(cfg.units, UnitSystem::Metric);
        assert_eq!(cfg.climate_provider_id().unwrap(), ClimateProviderId::OpenMeteo);
        assert_eq!(cfg.timeout_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn upsert_and_read_stored_key() {
        let mut cfg = Config::default();

        cfg.upsert_api_key(KeyedService::Meteostat, "METEO_KEY".into());
        assert_eq!(cfg.stored_api_key(KeyedService::Meteostat), Some("METEO_KEY"));

        cfg.upsert_api_key(KeyedService::Meteostat, "NEW_KEY".into());
        assert_eq!(cfg.stored_api_key(KeyedService::Meteostat), Some("NEW_KEY"));
    }

    #[test]
    fn env_var_overrides_stored_key() {
        let mut cfg = Config::default();
        cfg.upsert_api_key(KeyedService::OpenWeather, "FILE_KEY".into());

        let key = cfg.api_key_with_env(KeyedService::OpenWeather, |var| {
            (var == "OPENWEATHER_API_KEY").then(|| "ENV_KEY".to_string())
        });
        assert_eq!(key.as_deref(), Some("ENV_KEY"));
    }

    #[test]
    fn blank_env_var_falls_back_to_stored_key() {
        let mut cfg = Config::default();
        cfg.upsert_api_key(KeyedService::Meteostat, "FILE_KEY".into());

        let key = cfg.api_key_with_env(KeyedService::Meteostat, |_| Some("   ".to_string()));
        assert_eq!(key.as_deref(), Some("FILE_KEY"));

        let key = cfg.api_key_with_env(KeyedService::Meteostat, |_| None);
        assert_eq!(key.as_deref(), Some("FILE_KEY"));
    }

    #[test]
    fn env_var_alone_is_enough() {
        let cfg = Config::default();
        let key = cfg.api_key_with_env(KeyedService::Meteostat, |var| {
            (var == "METEOSTAT_API_KEY").then(|| "ENV_ONLY".to_string())
        });
        assert_eq!(key.as_deref(), Some("ENV_ONLY"));
        assert_eq!(cfg.api_key_with_env(KeyedService::Meteostat, |_| None), None);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_api_key(KeyedService::Meteostat, "  ".into());
        assert_eq!(cfg.stored_api_key(KeyedService::Meteostat), None);
    }

    #[test]
    fn unknown_climate_provider_errors() {
        let cfg = Config {
            climate_provider: Some("noaa".into()),
            ..Config::default()
        };
        let err = cfg.climate_provider_id().unwrap_err();
        assert!(err.to_string().contains("Unknown climate provider"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config {
            units: UnitSystem::Imperial,
            timeout_secs: Some(3),
            ..Config::default()
        };
        cfg.set_climate_provider(ClimateProviderId::Meteostat);
        cfg.upsert_api_key(KeyedService::OpenWeather, "OW".into());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.units, UnitSystem::Imperial);
        assert_eq!(loaded.timeout_secs(), 3);
        assert_eq!(loaded.climate_provider_id().unwrap(), ClimateProviderId::Meteostat);
        assert_eq!(loaded.stored_api_key(KeyedService::OpenWeather), Some("OW"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn parses_minimal_toml() {
        let cfg: Config = toml::from_str(
            r#"
            units = "imperial"

            [providers.openweather]
            api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.units, UnitSystem::Imperial);
        assert_eq!(cfg.stored_api_key(KeyedService::OpenWeather), Some("abc"));
    }
}
