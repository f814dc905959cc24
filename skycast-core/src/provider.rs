use crate::{
    Config, DashboardError,
    model::{Coordinates, CurrentConditions, DailyRecord, Observation, UnitSystem},
    provider::{meteostat::MeteostatProvider, openmeteo::OpenMeteoProvider, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

pub mod meteostat;
pub mod openmeteo;
pub mod openweather;

/// Services that need an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyedService {
    OpenWeather,
    Meteostat,
}

impl KeyedService {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyedService::OpenWeather => "openweather",
            KeyedService::Meteostat => "meteostat",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            KeyedService::OpenWeather => "OPENWEATHER_API_KEY",
            KeyedService::Meteostat => "METEOSTAT_API_KEY",
        }
    }

    pub const fn all() -> &'static [KeyedService] {
        &[KeyedService::OpenWeather, KeyedService::Meteostat]
    }
}

impl std::fmt::Display for KeyedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for KeyedService {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "openweather" => Ok(KeyedService::OpenWeather),
            "meteostat" => Ok(KeyedService::Meteostat),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, meteostat."
            )),
        }
    }
}

/// Source of historical daily means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClimateProviderId {
    #[default]
    OpenMeteo,
    Meteostat,
}

impl ClimateProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateProviderId::OpenMeteo => "open-meteo",
            ClimateProviderId::Meteostat => "meteostat",
        }
    }

    pub const fn all() -> &'static [ClimateProviderId] {
        &[ClimateProviderId::OpenMeteo, ClimateProviderId::Meteostat]
    }
}

impl std::fmt::Display for ClimateProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ClimateProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "open-meteo" | "openmeteo" => Ok(ClimateProviderId::OpenMeteo),
            "meteostat" => Ok(ClimateProviderId::Meteostat),
            _ => Err(anyhow::anyhow!(
                "Unknown climate provider '{value}'. Supported providers: open-meteo, meteostat."
            )),
        }
    }
}

/// Geocoding, current conditions and the 3-hour forecast.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// `Ok(None)` means the provider knows no such place.
    async fn geocode(&self, name: &str) -> Result<Option<Coordinates>, DashboardError>;

    async fn current(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<CurrentConditions, DashboardError>;

    async fn forecast(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<Vec<Observation>, DashboardError>;
}

/// Daily mean temperatures (Celsius) for a date range, inclusive.
#[async_trait]
pub trait ClimateProvider: Send + Sync + Debug {
    async fn daily_history(
        &self,
        coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, DashboardError>;
}

pub(crate) fn http_client(
    provider: &'static str,
    timeout_secs: u64,
) -> Result<Client, DashboardError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|source| DashboardError::Http { provider, source })
}

/// Construct the OpenWeather provider from config.
pub fn weather_provider_from_config(
    config: &Config,
) -> Result<Box<dyn WeatherProvider>, DashboardError> {
    let api_key = config
        .api_key(KeyedService::OpenWeather)
        .ok_or(DashboardError::MissingApiKey(KeyedService::OpenWeather.as_str()))?;

    let http = http_client(KeyedService::OpenWeather.as_str(), config.timeout_secs())?;

    Ok(Box::new(OpenWeatherProvider::with_client(api_key, http)))
}

/// Construct a climate provider from config and explicit id.
pub fn climate_provider_from_config(
    id: ClimateProviderId,
    config: &Config,
) -> Result<Box<dyn ClimateProvider>, DashboardError> {
    let http = http_client(id.as_str(), config.timeout_secs())?;

    let boxed: Box<dyn ClimateProvider> = match id {
        ClimateProviderId::OpenMeteo => Box::new(OpenMeteoProvider::with_client(http)),
        ClimateProviderId::Meteostat => {
            let api_key = config
                .api_key(KeyedService::Meteostat)
                .ok_or(DashboardError::MissingApiKey(KeyedService::Meteostat.as_str()))?;
            Box::new(MeteostatProvider::with_client(api_key, http))
        }
    };

    Ok(boxed)
}

/// Pull the `message` field out of an error body, else a truncated body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| truncate_body(body))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

/// Send a GET request and return the body of a successful response.
pub(crate) async fn fetch_body(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, DashboardError> {
    let res = request
        .send()
        .await
        .map_err(|source| DashboardError::Http { provider, source })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| DashboardError::Http { provider, source })?;

    if !status.is_success() {
        return Err(DashboardError::UpstreamFetch {
            provider,
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(body)
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    body: &str,
) -> Result<T, DashboardError> {
    serde_json::from_str(body).map_err(|err| DashboardError::UnexpectedResponse {
        provider,
        message: err.to_string(),
    })
}
