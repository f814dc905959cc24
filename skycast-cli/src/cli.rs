use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode, Text};
use skycast_core::{
    ClimateProviderId, Config, Coordinates, Dashboard, DashboardError, KeyedService,
    LocationSelection, UnitSystem,
    provider::{climate_provider_from_config, weather_provider_from_config},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather dashboard: current conditions, 5-day forecast and monthly history")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key of a provider ("openweather" or "meteostat").
    Configure {
        /// Provider short name.
        provider: String,
    },

    /// Show the dashboard for a city or a coordinate pair.
    Show {
        /// City name, e.g. "Tel Aviv".
        #[arg(required_unless_present = "lat", conflicts_with = "lat")]
        city: Option<String>,

        /// Latitude, used together with --lon instead of a city name.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[command(flatten)]
        options: PassOptions,
    },

    /// Prompt for locations repeatedly, rendering a fresh dashboard each time.
    Interactive {
        #[command(flatten)]
        options: PassOptions,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PassOptions {
    /// Unit system: metric or imperial. Defaults to the configured one.
    #[arg(long, value_parser = parse_units)]
    pub units: Option<UnitSystem>,

    /// Historical data source: open-meteo or meteostat.
    #[arg(long)]
    pub climate: Option<String>,

    /// Print the report as JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

fn parse_units(value: &str) -> Result<UnitSystem, String> {
    UnitSystem::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show {
                city,
                lat,
                lon,
                options,
            } => {
                let selection = match (city, lat, lon) {
                    (Some(name), _, _) => LocationSelection::parse(&name)?,
                    (None, Some(lat), Some(lon)) => {
                        LocationSelection::Coordinates(Coordinates::new(lat, lon)?)
                    }
                    _ => anyhow::bail!("Provide a city name or both --lat and --lon."),
                };

                let config = Config::load()?;
                let session = Session::new(&config, &options)?;
                session.show(&selection).await
            }
            Command::Interactive { options } => {
                let config = Config::load()?;
                let session = Session::new(&config, &options)?;
                session.interactive().await
            }
        }
    }
}

fn configure(provider: &str) -> Result<()> {
    let service = KeyedService::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("{service} API key:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    anyhow::ensure!(!api_key.is_empty(), "API key must not be empty");

    config.upsert_api_key(service, api_key);

    if service == KeyedService::Meteostat {
        let make_default = Confirm::new("Use meteostat for historical data by default?")
            .with_default(true)
            .prompt()
            .context("Failed to read answer")?;
        if make_default {
            config.set_climate_provider(ClimateProviderId::Meteostat);
        }
    }

    let path = config.save()?;
    println!("Saved {service} credentials to {}", path.display());
    Ok(())
}

/// Settings shared by every pass of one invocation.
struct Session {
    dashboard: Dashboard,
    units: UnitSystem,
    json: bool,
}

impl Session {
    fn new(config: &Config, options: &PassOptions) -> Result<Self> {
        let climate_id = match options.climate.as_deref() {
            Some(s) => ClimateProviderId::try_from(s)?,
            None => config.climate_provider_id()?,
        };

        let dashboard = Dashboard::new(
            weather_provider_from_config(config)?,
            climate_provider_from_config(climate_id, config)?,
        );

        Ok(Self {
            dashboard,
            units: options.units.unwrap_or(config.units),
            json: options.json,
        })
    }

    async fn show(&self, selection: &LocationSelection) -> Result<()> {
        let today = Local::now().date_naive();
        let report = self.dashboard.run(selection, self.units, today).await?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        } else {
            print!("{}", render::ReportView(&report));
        }
        Ok(())
    }

    async fn interactive(&self) -> Result<()> {
        println!("Enter a city name or coordinates as `lat,lon`. Leave empty to quit.");

        loop {
            let input = match Text::new("Location:").prompt() {
                Ok(input) => input,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
                Err(err) => return Err(err).context("Failed to read location"),
            };

            if input.trim().is_empty() {
                break;
            }

            let result = match LocationSelection::parse(&input) {
                Ok(selection) => {
                    let today = Local::now().date_naive();
                    self.dashboard.run(&selection, self.units, today).await
                }
                Err(err) => Err(err),
            };

            match result {
                Ok(report) if self.json => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(err) => eprintln!("Failed to serialize report: {err}"),
                },
                Ok(report) => print!("{}", render::ReportView(&report)),
                Err(err) => match recovery(&err) {
                    Recovery::Reprompt(hint) => eprintln!("{hint}"),
                    Recovery::Report(detail) => {
                        tracing::warn!("Pass failed: {err}");
                        eprintln!("{detail}");
                    }
                },
            }
        }

        Ok(())
    }
}

/// How the interactive loop answers a failed pass.
#[derive(Debug, PartialEq, Eq)]
enum Recovery {
    /// The location was wrong: say so briefly and ask again.
    Reprompt(String),
    /// Anything else: the pass is abandoned and the full error is shown.
    Report(String),
}

fn recovery(err: &DashboardError) -> Recovery {
    if err.is_user_correctable() {
        Recovery::Reprompt(err.user_message().to_string())
    } else {
        Recovery::Report(format!("{}\n  {err}", err.user_message()))
    }
}
