//! Reductions from raw provider records to per-day and per-month rows.
//!
//! Groups keep the order in which their first member appears in the input.
//! All numeric outputs are rounded once, to the nearest integer, half away
//! from zero.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::DashboardError;
use crate::model::{DailyRecord, GroupSummary, MonthlySummary, Observation, UnitSystem};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reduce 3-hour forecast entries to one row per calendar date.
pub fn summarize_forecast(
    observations: &[Observation],
    units: UnitSystem,
) -> Result<Vec<GroupSummary>, DashboardError> {
    let keyed = observations
        .iter()
        .map(|obs| Ok((observation_date(obs)?, obs)))
        .collect::<Result<Vec<_>, DashboardError>>()?;

    group_stable(keyed)
        .into_iter()
        .map(|(date, items)| reduce_day(date, &items, units))
        .collect()
}

/// Reduce a year of daily means to one row per month. Missing values are skipped.
pub fn summarize_historical(records: &[DailyRecord]) -> Vec<MonthlySummary> {
    let keyed = records.iter().filter_map(|rec| {
        let temp = rec.avg_temp.filter(|t| t.is_finite())?;
        Some(((rec.date.year(), rec.date.month()), temp))
    });

    group_stable(keyed)
        .into_iter()
        .map(|((year, month), temps)| {
            let mean = temps.iter().sum::<f64>() / temps.len() as f64;
            MonthlySummary {
                month_label: format!("{month:02}-{year}"),
                avg_temp_c: round_to_int(mean),
                avg_temp_f: round_to_int(celsius_to_fahrenheit(mean)),
            }
        })
        .collect()
}

fn observation_date(obs: &Observation) -> Result<NaiveDate, DashboardError> {
    NaiveDateTime::parse_from_str(obs.timestamp.trim(), TIMESTAMP_FORMAT)
        .map(|dt| dt.date())
        .map_err(|_| DashboardError::MalformedTimestamp(obs.timestamp.clone()))
}

fn reduce_day(
    date: NaiveDate,
    items: &[&Observation],
    units: UnitSystem,
) -> Result<GroupSummary, DashboardError> {
    let temp_min = items
        .iter()
        .map(|o| o.temp_min)
        .reduce(f64::min)
        .ok_or(DashboardError::EmptyGroupReduction)?;
    let temp_max = items
        .iter()
        .map(|o| o.temp_max)
        .reduce(f64::max)
        .ok_or(DashboardError::EmptyGroupReduction)?;

    let wind_mean = items.iter().map(|o| o.wind_speed).sum::<f64>() / items.len() as f64;

    let dominant_condition = stable_mode(items.iter().map(|o| o.condition_label.as_str()))
        .ok_or(DashboardError::EmptyGroupReduction)?;
    let dominant_icon = stable_mode(items.iter().map(|o| o.icon_code.as_str()))
        .ok_or(DashboardError::EmptyGroupReduction)?;

    Ok(GroupSummary {
        date,
        temp_min: round_to_int(temp_min),
        temp_max: round_to_int(temp_max),
        wind_speed_avg: round_to_int(wind_mean * units.wind_factor()),
        dominant_condition: dominant_condition.to_string(),
        dominant_icon: dominant_icon.to_string(),
    })
}

/// Group values by key, keeping first-seen key order and input order within a group.
fn group_stable<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Copy,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();

    for (key, value) in items {
        match index.get(&key) {
            Some(&i) => groups[i].1.push(value),
            None => {
                index.insert(key, groups.len());
                groups.push((key, vec![value]));
            }
        }
    }

    groups
}

/// Most frequent value; on a tie the one seen first wins.
pub fn stable_mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (value, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((value, n));
        }
    }
    best.map(|(v, _)| v)
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn round_to_int(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ts: &str, min: f64, max: f64, wind: f64, cond: &str, icon: &str) -> Observation {
        Observation {
            timestamp: ts.to_string(),
            temp_min: min,
            temp_max: max,
            wind_speed: wind,
            condition_label: cond.to_string(),
            icon_code: icon.to_string(),
        }
    }

    fn daily(date: &str, temp: Option<f64>) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            avg_temp: temp,
        }
    }

    #[test]
    fn single_day_metric_summary() {
        let input = vec![
            obs("2024-05-01 09:00:00", 10.0, 18.0, 2.0, "Rain", "10d"),
            obs("2024-05-01 12:00:00", 12.0, 20.0, 3.0, "Rain", "10d"),
            obs("2024-05-01 15:00:00", 9.0, 19.0, 2.5, "Clouds", "04d"),
        ];

        let out = summarize_forecast(&input, UnitSystem::Metric).unwrap();

        assert_eq!(out.len(), 1);
        let day = &out[0];
        assert_eq!(day.label(), "01/05/2024");
        assert_eq!(day.temp_min, 9);
        assert_eq!(day.temp_max, 20);
        assert_eq!(day.wind_speed_avg, 9);
        assert_eq!(day.dominant_condition, "Rain");
        assert_eq!(day.dominant_icon, "10d");
    }

    #[test]
    fn imperial_wind_is_not_converted() {
        let input = vec![
            obs("2024-05-01 09:00:00", 50.0, 60.0, 4.0, "Clear", "01d"),
            obs("2024-05-01 12:00:00", 52.0, 64.0, 7.0, "Clear", "01d"),
        ];

        let out = summarize_forecast(&input, UnitSystem::Imperial).unwrap();
        assert_eq!(out[0].wind_speed_avg, 6);
    }

    #[test]
    fn groups_follow_first_seen_order() {
        let input = vec![
            obs("2024-05-02 00:00:00", 1.0, 2.0, 1.0, "Snow", "13n"),
            obs("2024-05-01 21:00:00", 3.0, 4.0, 1.0, "Clear", "01n"),
            obs("2024-05-02 03:00:00", 0.0, 5.0, 1.0, "Snow", "13n"),
            obs("2024-05-03 03:00:00", 0.0, 5.0, 1.0, "Mist", "50n"),
        ];

        let out = summarize_forecast(&input, UnitSystem::Metric).unwrap();
        let labels: Vec<_> = out.iter().map(|g| g.label()).collect();

        assert_eq!(labels, ["02/05/2024", "01/05/2024", "03/05/2024"]);
        assert_eq!(out[0].temp_min, 0);
        assert_eq!(out[0].temp_max, 5);
    }

    #[test]
    fn bounds_and_mode_hold_per_group() {
        let input = vec![
            obs("2024-05-01 00:00:00", 10.4, 14.2, 1.0, "Clouds", "03n"),
            obs("2024-05-01 03:00:00", 9.6, 15.6, 1.0, "Rain", "10n"),
            obs("2024-05-02 00:00:00", 7.2, 11.0, 1.0, "Clear", "01n"),
        ];

        for day in summarize_forecast(&input, UnitSystem::Metric).unwrap() {
            let members: Vec<_> = input
                .iter()
                .filter(|o| o.timestamp.starts_with(&day.date.format("%Y-%m-%d").to_string()))
                .collect();
            for m in &members {
                assert!(day.temp_min as f64 <= m.temp_min.round());
                assert!(day.temp_max as f64 >= m.temp_max.round());
            }
            assert!(members.iter().any(|m| m.condition_label == day.dominant_condition));
        }
    }

    #[test]
    fn condition_and_icon_reduced_independently() {
        let input = vec![
            obs("2024-05-01 00:00:00", 1.0, 2.0, 1.0, "Clouds", "04n"),
            obs("2024-05-01 03:00:00", 1.0, 2.0, 1.0, "Rain", "04n"),
            obs("2024-05-01 06:00:00", 1.0, 2.0, 1.0, "Rain", "10d"),
            obs("2024-05-01 09:00:00", 1.0, 2.0, 1.0, "Clouds", "04d"),
        ];

        let out = summarize_forecast(&input, UnitSystem::Metric).unwrap();
        // Clouds and Rain tie at two, Clouds was seen first.
        assert_eq!(out[0].dominant_condition, "Clouds");
        assert_eq!(out[0].dominant_icon, "04n");
    }

    #[test]
    fn empty_forecast_is_empty() {
        let out = summarize_forecast(&[], UnitSystem::Metric).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn malformed_timestamp_fails() {
        let input = vec![
            obs("2024-05-01 00:00:00", 1.0, 2.0, 1.0, "Clear", "01n"),
            obs("01/05/2024 03:00", 1.0, 2.0, 1.0, "Clear", "01n"),
        ];

        let err = summarize_forecast(&input, UnitSystem::Metric).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedTimestamp(ts) if ts == "01/05/2024 03:00"));
    }

    #[test]
    fn forecast_is_idempotent() {
        let input = vec![
            obs("2024-05-01 00:00:00", 1.0, 2.0, 1.5, "Clear", "01n"),
            obs("2024-05-02 00:00:00", 3.0, 4.0, 2.5, "Rain", "10n"),
        ];

        let first = summarize_forecast(&input, UnitSystem::Metric).unwrap();
        let second = summarize_forecast(&input, UnitSystem::Metric).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn monthly_means_and_fahrenheit() {
        let input = vec![
            daily("2024-06-01", Some(19.0)),
            daily("2024-06-02", Some(21.0)),
            daily("2024-07-01", Some(25.4)),
            daily("2024-07-02", None),
            daily("2024-07-03", Some(25.8)),
        ];

        let out = summarize_historical(&input);

        assert_eq!(
            out,
            vec![
                MonthlySummary {
                    month_label: "06-2024".into(),
                    avg_temp_c: 20,
                    avg_temp_f: 68,
                },
                MonthlySummary {
                    month_label: "07-2024".into(),
                    avg_temp_c: 26,
                    avg_temp_f: 78,
                },
            ]
        );
    }

    #[test]
    fn fahrenheit_uses_unrounded_mean() {
        // mean 20.4: rounding first would give 20 -> 68, unrounded gives 68.72 -> 69
        let input = vec![daily("2024-06-01", Some(20.4))];
        let out = summarize_historical(&input);
        assert_eq!(out[0].avg_temp_c, 20);
        assert_eq!(out[0].avg_temp_f, 69);
    }

    #[test]
    fn months_across_year_boundary_stay_chronological() {
        let input = vec![
            daily("2024-11-30", Some(8.0)),
            daily("2024-12-31", Some(4.0)),
            daily("2025-01-01", Some(2.0)),
        ];

        let labels: Vec<_> = summarize_historical(&input)
            .into_iter()
            .map(|m| m.month_label)
            .collect();
        assert_eq!(labels, ["11-2024", "12-2024", "01-2025"]);
    }

    #[test]
    fn historical_empty_or_all_missing() {
        assert!(summarize_historical(&[]).is_empty());
        assert!(summarize_historical(&[daily("2024-01-01", None)]).is_empty());
        assert!(summarize_historical(&[daily("2024-01-01", Some(f64::NAN))]).is_empty());
    }

    #[test]
    fn stable_mode_prefers_first_on_tie() {
        assert_eq!(stable_mode(["a", "b", "b", "a"]), Some("a"));
        assert_eq!(stable_mode(["a", "b", "b"]), Some("b"));
        assert_eq!(stable_mode(std::iter::empty()), None);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to_int(2.5), 3);
        assert_eq!(round_to_int(-0.5), -1);
        assert_eq!(round_to_int(-0.4), 0);
    }
}
