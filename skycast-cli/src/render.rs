use skycast_core::{DashboardReport, LocationSelection};
use std::fmt;

/// Plain-text rendering of one dashboard pass.
pub struct ReportView<'a>(pub &'a DashboardReport);

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let units = report.units;
        let temp = units.temperature_suffix();
        let wind = units.wind_suffix();

        match &report.selection {
            LocationSelection::City { name } => {
                writeln!(f, "Found {} at {}", title_case(name), report.coordinates)?;
            }
            LocationSelection::Coordinates(coords) => {
                writeln!(f, "Location selected: {coords}")?;
            }
        }

        let c = &report.current;
        writeln!(f, "\nCurrent Weather")?;
        writeln!(f, "  {}, {}  {} {}", c.city, c.country, c.local_date_label(), c.local_time_label())?;
        writeln!(f, "  {} ({})", c.condition, c.icon)?;
        writeln!(f, "  Temperature {}{temp}, feels like {}{temp}", c.temperature, c.feels_like)?;
        writeln!(f, "  Humidity {} %, wind {} {wind}", c.humidity_pct, c.wind_speed)?;

        writeln!(f, "\n5-Day Forecast")?;
        writeln!(
            f,
            "  {:<10}  {:>6}  {:>6}  {:>8}  {:<12}  {:<4}",
            "Date",
            format!("Min{temp}"),
            format!("Max{temp}"),
            format!("Wind {wind}"),
            "Weather",
            "Icon"
        )?;
        for day in &report.forecast {
            writeln!(
                f,
                "  {:<10}  {:>6}  {:>6}  {:>8}  {:<12}  {:<4}",
                day.label(),
                day.temp_min,
                day.temp_max,
                day.wind_speed_avg,
                day.dominant_condition,
                day.dominant_icon
            )?;
        }

        writeln!(f, "\nHistoric Monthly Averages")?;
        if report.historical.is_empty() {
            return writeln!(f, "  No historical data available for this location.");
        }

        writeln!(f, "  {:<7}  {:>6}  {:>6}", "Month", "Avg°C", "Avg°F")?;
        for month in &report.historical {
            writeln!(
                f,
                "  {:<7}  {:>6}  {:>6}",
                month.month_label, month.avg_temp_c, month.avg_temp_f
            )?;
        }

        Ok(())
    }
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
