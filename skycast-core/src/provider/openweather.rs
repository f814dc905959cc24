use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    DashboardError,
    aggregate::round_to_int,
    model::{Coordinates, CurrentConditions, Observation, UnitSystem},
    provider::{fetch_body, parse_json},
};

use super::WeatherProvider;

const PROVIDER: &str = "openweather";
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    /// Point the provider at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_coords<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<T, DashboardError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, lat = coords.lat, lon = coords.lon, %units, "OpenWeather request");

        let request = self.http.get(&url).query(&[
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("units", units.as_str().to_string()),
            ("appid", self.api_key.clone()),
        ]);

        let body = fetch_body(PROVIDER, request).await?;
        parse_json(PROVIDER, &body)
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwRange {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: Option<i64>,
    timezone: Option<i32>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwRange,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn geocode(&self, name: &str) -> Result<Option<Coordinates>, DashboardError> {
        let url = format!("{}/geo/1.0/direct", self.base_url);
        tracing::debug!(%url, name, "OpenWeather geocoding request");

        let request = self.http.get(&url).query(&[
            ("q", name),
            ("limit", "1"),
            ("appid", self.api_key.as_str()),
        ]);

        let body = fetch_body(PROVIDER, request).await?;
        let entries: Vec<OwGeoEntry> = parse_json(PROVIDER, &body)?;

        Ok(entries.first().map(|e| Coordinates { lat: e.lat, lon: e.lon }))
    }

    async fn current(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<CurrentConditions, DashboardError> {
        let parsed: OwCurrentResponse = self.get_coords("/data/2.5/weather", coords, units).await?;

        let (Some(dt), Some(timezone)) = (parsed.dt, parsed.timezone) else {
            return Err(unexpected("current weather is missing 'dt' or 'timezone'"));
        };
        if FixedOffset::east_opt(timezone).is_none() {
            return Err(unexpected(format!("current weather 'timezone' out of range: {timezone}")));
        }
        let observation_time = unix_to_utc(dt)
            .ok_or_else(|| unexpected(format!("current weather 'dt' out of range: {dt}")))?;

        let weather = parsed
            .weather
            .first()
            .ok_or_else(|| unexpected("current weather has no conditions"))?;

        Ok(CurrentConditions {
            country: parsed.sys.country,
            city: parsed.name,
            condition: weather.main.clone(),
            icon: weather.icon.clone(),
            humidity_pct: round_to_int(parsed.main.humidity),
            temperature: round_to_int(parsed.main.temp),
            feels_like: round_to_int(parsed.main.feels_like),
            wind_speed: round_to_int(parsed.wind.speed * units.wind_factor()),
            observation_time,
            utc_offset_secs: timezone,
        })
    }

    async fn forecast(
        &self,
        coords: Coordinates,
        units: UnitSystem,
    ) -> Result<Vec<Observation>, DashboardError> {
        let parsed: OwForecastResponse =
            self.get_coords("/data/2.5/forecast", coords, units).await?;

        parsed
            .list
            .into_iter()
            .map(|entry| {
                let weather = entry.weather.into_iter().next().ok_or_else(|| {
                    unexpected(format!("forecast entry {} has no conditions", entry.dt_txt))
                })?;
                Ok(Observation {
                    timestamp: entry.dt_txt,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    wind_speed: entry.wind.speed,
                    condition_label: weather.main,
                    icon_code: weather.icon,
                })
            })
            .collect()
    }
}

fn unexpected(message: impl Into<String>) -> DashboardError {
    DashboardError::UnexpectedResponse {
        provider: PROVIDER,
        message: message.into(),
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
