use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DashboardError;

/// Unit system used for requests to the weather provider and for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn wind_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "km/h",
            UnitSystem::Imperial => "mph",
        }
    }

    /// Factor from the provider's wind unit (m/s or mph) to the display unit.
    pub fn wind_factor(&self) -> f64 {
        match self {
            UnitSystem::Metric => 3.6,
            UnitSystem::Imperial => 1.0,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Build coordinates from user input, rejecting out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, DashboardError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DashboardError::InvalidLocation(format!(
                "latitude {lat} is outside -90..90"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(DashboardError::InvalidLocation(format!(
                "longitude {lon} is outside -180..180"
            )));
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Latitude {:.2}, Longitude {:.2}", self.lat, self.lon)
    }
}

/// What the user picked for this pass: a typed city or a point on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationSelection {
    City { name: String },
    Coordinates(Coordinates),
}

impl LocationSelection {
    pub fn city(name: impl Into<String>) -> Self {
        LocationSelection::City { name: name.into() }
    }

    /// Parse free text: `"lat,lon"` becomes coordinates, anything else a city.
    pub fn parse(input: &str) -> Result<Self, DashboardError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DashboardError::InvalidLocation(
                "empty location".to_string(),
            ));
        }

        if let Some((lat, lon)) = input.split_once(',') {
            if let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
                return Coordinates::new(lat, lon).map(LocationSelection::Coordinates);
            }
        }

        Ok(LocationSelection::city(input))
    }
}

/// One 3-hour forecast entry as received from the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Raw provider text, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
    pub temp_min: f64,
    pub temp_max: f64,
    /// m/s for metric requests, mph for imperial.
    pub wind_speed: f64,
    pub condition_label: String,
    pub icon_code: String,
}

/// A single day of historical climate data, Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub avg_temp: Option<f64>,
}

/// Forecast reduced to one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub date: NaiveDate,
    pub temp_min: i64,
    pub temp_max: i64,
    pub wind_speed_avg: i64,
    pub dominant_condition: String,
    pub dominant_icon: String,
}

impl GroupSummary {
    pub fn label(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

/// Historical averages reduced to one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// `MM-YYYY`
    pub month_label: String,
    pub avg_temp_c: i64,
    pub avg_temp_f: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub country: String,
    pub city: String,
    pub condition: String,
    pub icon: String,
    pub humidity_pct: i64,
    pub temperature: i64,
    pub feels_like: i64,
    /// Already in the display unit (km/h or mph).
    pub wind_speed: i64,
    pub observation_time: DateTime<Utc>,
    pub utc_offset_secs: i32,
}

impl CurrentConditions {
    /// UTC offset of the location. Offsets outside ±24h fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    pub fn local_time(&self) -> DateTime<FixedOffset> {
        self.observation_time.with_timezone(&self.utc_offset())
    }

    pub fn local_date_label(&self) -> String {
        self.local_time().format("%d/%m/%Y").to_string()
    }

    pub fn local_time_label(&self) -> String {
        self.local_time().format("%H:%M").to_string()
    }
}

/// Everything one dashboard pass produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub selection: LocationSelection,
    pub coordinates: Coordinates,
    pub units: UnitSystem,
    pub current: CurrentConditions,
    pub forecast: Vec<GroupSummary>,
    pub historical: Vec<MonthlySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_selection_coordinates() {
        let sel = LocationSelection::parse(" 32.08, 34.78 ").unwrap();
        assert_eq!(
            sel,
            LocationSelection::Coordinates(Coordinates { lat: 32.08, lon: 34.78 })
        );
    }

    #[test]
    fn parse_selection_city() {
        let sel = LocationSelection::parse("Tel Aviv").unwrap();
        assert_eq!(sel, LocationSelection::city("Tel Aviv"));

        // A comma without two numbers is still a city name.
        let sel = LocationSelection::parse("Paris, FR").unwrap();
        assert_eq!(sel, LocationSelection::city("Paris, FR"));
    }

    #[test]
    fn parse_selection_rejects_blank_and_out_of_range() {
        assert!(matches!(
            LocationSelection::parse("   "),
            Err(DashboardError::InvalidLocation(_))
        ));
        assert!(matches!(
            LocationSelection::parse("95,10"),
            Err(DashboardError::InvalidLocation(_))
        ));
        assert!(matches!(
            Coordinates::new(10.0, -181.0),
            Err(DashboardError::InvalidLocation(_))
        ));
    }

    #[test]
    fn unit_system_try_from() {
        assert_eq!(UnitSystem::try_from("Imperial").unwrap(), UnitSystem::Imperial);
        assert!(UnitSystem::try_from("kelvin").is_err());
    }

    #[test]
    fn local_time_applies_offset() {
        let current = CurrentConditions {
            country: "IL".into(),
            city: "Tel Aviv".into(),
            condition: "Clear".into(),
            icon: "01d".into(),
            humidity_pct: 60,
            temperature: 25,
            feels_like: 26,
            wind_speed: 12,
            observation_time: Utc.with_ymd_and_hms(2024, 12, 31, 22, 30, 0).unwrap(),
            utc_offset_secs: 7200,
        };

        assert_eq!(current.local_date_label(), "01/01/2025");
        assert_eq!(current.local_time_label(), "00:30");
        assert_eq!(current.local_time().offset().local_minus_utc(), 7200);
        assert_eq!(current.local_time().with_timezone(&Utc), current.observation_time);
    }

    #[test]
    fn negative_offset_moves_date_back() {
        let current = CurrentConditions {
            country: "US".into(),
            city: "New York".into(),
            condition: "Snow".into(),
            icon: "13n".into(),
            humidity_pct: 80,
            temperature: 30,
            feels_like: 24,
            wind_speed: 9,
            observation_time: Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap(),
            utc_offset_secs: -18000,
        };

        assert_eq!(current.local_date_label(), "31/12/2024");
        assert_eq!(current.local_time_label(), "22:00");
        assert_eq!(current.local_time().to_rfc3339(), "2024-12-31T22:00:00-05:00");
    }
}
