//! Core library for the `skycast` weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather and historical-climate providers
//! - Forecast and historical aggregation
//! - Shared domain models (locations, observations, summaries)
//!
//! It is used by `skycast-cli`, but can also be reused by other front-ends.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod provider;

pub use aggregate::{summarize_forecast, summarize_historical};
pub use config::{Config, ProviderConfig};
pub use dashboard::Dashboard;
pub use error::DashboardError;
pub use model::{
    Coordinates, CurrentConditions, DailyRecord, DashboardReport, GroupSummary,
    LocationSelection, MonthlySummary, Observation, UnitSystem,
};
pub use provider::{ClimateProvider, ClimateProviderId, KeyedService, WeatherProvider};
