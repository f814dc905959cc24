//! Historical daily means from the Meteostat JSON API (RapidAPI key required).

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

const PROVIDER: &str = "meteostat";
const DEFAULT_BASE_URL: &str = "https://meteostat.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "meteostat.p.rapidapi.com";

#[derive(Debug, Clone)]
pub struct MeteostatProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl MeteostatProvider {
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

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct MsResponse {
    #[serde(default)]
    data: Vec<MsDaily>,
}

#[derive(Debug, Deserialize)]
struct MsDaily {
    date: String,
    tavg: Option<f64>,
}

#[async_trait]
impl ClimateProvider for MeteostatProvider {
    async fn daily_history(
        &self,
        coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, DashboardError> {
        let url = format!("{}/point/daily", self.base_url);
        tracing::debug!(%url, %start, %end, "Meteostat daily request");

        let request = self
            .http
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("start", start.format("%Y-%m-%d").to_string()),
                ("end", end.format("%Y-%m-%d").to_string()),
            ]);

        let body = fetch_body(PROVIDER, request).await?;
        let parsed: MsResponse = parse_json(PROVIDER, &body)?;

        parsed
            .data
            .into_iter()
            .map(|row| {
                // Meteostat dates may carry a time part: "2024-01-01 00:00:00".
                let day = row.date.get(..10).unwrap_or(row.date.as_str());
                let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map_err(|_| DashboardError::MalformedTimestamp(row.date.clone()))?;
                Ok(DailyRecord {
                    date,
                    avg_temp: row.tavg,
                })
            })
            .collect()
    }
}
