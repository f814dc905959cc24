//! Historical daily means from the Open-Meteo archive API (no key required).

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    DashboardError,
    model::{Coordinates, DailyRecord},
    provider::{fetch_body, parse_json},
};

use super::ClimateProvider;

const PROVIDER: &str = "open-meteo";
const DEFAULT_BASE_URL: &str = "https://archive-api.open-meteo.com";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<ArchiveDaily>,
}

#[derive(Debug, Deserialize)]
struct ArchiveDaily {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
}

#[async_trait]
impl ClimateProvider for OpenMeteoProvider {
    async fn daily_history(
        &self,
        coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, DashboardError> {
        let url = format!("{}/v1/archive", self.base_url);
        tracing::debug!(%url, %start, %end, "Open-Meteo archive request");

        let request = self.http.get(&url).query(&[
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
            ("daily", "temperature_2m_mean".to_string()),
            ("timezone", "UTC".to_string()),
        ]);

        let body = fetch_body(PROVIDER, request).await?;
        let parsed: ArchiveResponse = parse_json(PROVIDER, &body)?;

        let Some(daily) = parsed.daily else {
            return Ok(Vec::new());
        };

        daily
            .time
            .iter()
            .enumerate()
            .map(|(i, day)| {
                let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map_err(|_| DashboardError::MalformedTimestamp(day.clone()))?;
                Ok(DailyRecord {
                    date,
                    avg_temp: daily.temperature_2m_mean.get(i).copied().flatten(),
                })
            })
            .collect()
    }
}
