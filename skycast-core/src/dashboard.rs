//! One dashboard pass: resolve the location, fetch, aggregate.

use chrono::{Duration, NaiveDate};

use crate::{
    DashboardError,
    aggregate::{summarize_forecast, summarize_historical},
    model::{Coordinates, DashboardReport, LocationSelection, UnitSystem},
    provider::{ClimateProvider, WeatherProvider},
};

/// Length of the trailing history window.
pub const HISTORY_DAYS: i64 = 365;

#[derive(Debug)]
pub struct Dashboard {
    weather: Box<dyn WeatherProvider>,
    climate: Box<dyn ClimateProvider>,
}

impl Dashboard {
    pub fn new(weather: Box<dyn WeatherProvider>, climate: Box<dyn ClimateProvider>) -> Self {
        Self { weather, climate }
    }

    /// Turn the user's selection into coordinates, geocoding city names.
    pub async fn resolve(&self, selection: &LocationSelection) -> Result<Coordinates, DashboardError> {
        match selection {
            LocationSelection::Coordinates(coords) => Ok(*coords),
            LocationSelection::City { name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(DashboardError::InvalidLocation("empty city name".to_string()));
                }

                let coords = self
                    .weather
                    .geocode(name)
                    .await?
                    .ok_or_else(|| DashboardError::LocationNotFound(name.to_string()))?;

                tracing::info!(city = name, lat = coords.lat, lon = coords.lon, "Resolved city");
                Ok(coords)
            }
        }
    }

    /// Run a full pass. Any failure aborts the pass; nothing is cached between runs.
    pub async fn run(
        &self,
        selection: &LocationSelection,
        units: UnitSystem,
        today: NaiveDate,
    ) -> Result<DashboardReport, DashboardError> {
        let coordinates = self.resolve(selection).await?;

        let current = self.weather.current(coordinates, units).await?;
        let observations = self.weather.forecast(coordinates, units).await?;
        let forecast = summarize_forecast(&observations, units)?;

        let start = today - Duration::days(HISTORY_DAYS);
        let records = self.climate.daily_history(coordinates, start, today).await?;
        let historical = summarize_historical(&records);
        if historical.is_empty() {
            tracing::warn!(%coordinates, "No historical data available");
        }

        tracing::info!(
            forecast_days = forecast.len(),
            historical_months = historical.len(),
            "Dashboard pass complete"
        );

        Ok(DashboardReport {
            selection: selection.clone(),
            coordinates,
            units,
            current,
            forecast,
            historical,
        })
    }
}
