//! Display-ready tables derived from a `ParsedForecast`.
//!
//! Charts take long-form rows (one per time × measure). Values are passed
//! through untouched; nothing here interpolates or converts units.

use chrono::{NaiveDate, TimeDelta};

use crate::error::ForecastError;
use crate::forecast::{DAILY_VARIABLES, HOURLY_VARIABLES, Variable, label_for};
use crate::model::{LongFormRow, ParsedForecast, Series};
use crate::summary::current_summary;

pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 2;

pub const DAILY_CHART_MEASURES: &[&str] = &[
    "temperature_2m_max",
    "temperature_2m_min",
    "apparent_temperature_max",
    "apparent_temperature_min",
];

pub const HOURLY_CHART_MEASURES: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "dew_point_2m",
    "apparent_temperature",
    "precipitation_probability",
];

/// Unpivot `measures` of `series` into rows labelled via `labels`.
///
/// Rows come out measure-major: every time point of the first measure, then
/// the second, and so on.
pub fn unpivot(
    series: &Series,
    measures: &[&str],
    labels: &[Variable],
) -> Result<Vec<LongFormRow>, ForecastError> {
    let mut rows = Vec::with_capacity(measures.len() * series.len());
    for &measure in measures {
        let column = series
            .column(measure)
            .ok_or_else(|| ForecastError::malformed(format!("no column '{measure}' to chart")))?;
        let label = label_for(labels, measure);
        rows.extend(
            series
                .times()
                .zip(&column.values)
                .map(|(time, &value)| LongFormRow {
                    time,
                    measure: label.clone(),
                    value,
                }),
        );
    }
    Ok(rows)
}

/// Grid points whose calendar date is before `now + lookahead_days`.
///
/// Only the date is compared: every hour of the cutoff day is dropped. A
/// window reaching past the last representable date keeps the whole series.
pub fn truncate_to_lookahead(series: &Series, lookahead_days: i64, now: NaiveDate) -> Series {
    let Some(cutoff) = TimeDelta::try_days(lookahead_days).and_then(|d| now.checked_add_signed(d)) else {
        return series.clone();
    };
    let keep = series.times().take_while(|t| t.date() < cutoff).count();
    series.head(keep)
}

pub fn build_daily_view(daily: &Series) -> Result<Vec<LongFormRow>, ForecastError> {
    unpivot(daily, DAILY_CHART_MEASURES, DAILY_VARIABLES)
}

pub fn build_hourly_view(
    hourly: &Series,
    lookahead_days: i64,
    now: NaiveDate,
) -> Result<Vec<LongFormRow>, ForecastError> {
    let window = truncate_to_lookahead(hourly, lookahead_days, now);
    unpivot(&window, HOURLY_CHART_MEASURES, HOURLY_VARIABLES)
}

/// Everything one display cycle shows for a forecast.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastView {
    pub summary: String,
    pub daily: Vec<LongFormRow>,
    pub hourly: Vec<LongFormRow>,
}

/// Build the whole view. `today` anchors the hourly lookahead window.
pub fn build_view(
    forecast: &ParsedForecast,
    lookahead_days: i64,
    today: NaiveDate,
) -> Result<ForecastView, ForecastError> {
    Ok(ForecastView {
        summary: current_summary(&forecast.current),
        daily: build_daily_view(&forecast.daily)?,
        hourly: build_hourly_view(&forecast.hourly, lookahead_days, today)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;
    use chrono::{Duration, NaiveDateTime};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn hourly(hours: usize) -> Series {
        let columns = HOURLY_VARIABLES
            .iter()
            .enumerate()
            .map(|(i, v)| Column {
                name: v.name.to_string(),
                values: (0..hours).map(|h| (i * 1000 + h) as f64).collect(),
            })
            .collect();
        let start = at(10, 0);
        Series::new(start, start + Duration::hours(hours as i64), 3600, columns).unwrap()
    }

    #[test]
    fn truncation_is_date_only() {
        let s = hourly(96);
        let t = truncate_to_lookahead(&s, 2, day(10));
        assert_eq!(t.len(), 48);
        assert_eq!(t.times().last(), Some(at(11, 23)));
        assert!(t.times().all(|x| x.date() < day(12)));
    }

    #[test]
    fn cutoff_day_excluded_at_every_hour() {
        let s = hourly(96);
        let t = truncate_to_lookahead(&s, 2, day(10));
        assert!(!t.times().any(|x| x == at(12, 0)));
        assert!(!t.times().any(|x| x == at(12, 23)));
        // noon "now" plus two days minus an hour still lands on the cutoff day
        let now = at(10, 12);
        let late = now + Duration::days(2) - Duration::hours(1);
        assert!(!t.times().any(|x| x == late));
        assert!(t.times().any(|x| x == at(11, 23)));
    }

    #[test]
    fn truncation_when_now_precedes_grid() {
        let s = hourly(24);
        assert_eq!(truncate_to_lookahead(&s, 2, day(1)).len(), 0);
        assert_eq!(truncate_to_lookahead(&s, 2, day(9)).len(), 24);
    }

    #[test]
    fn oversized_window_keeps_everything() {
        let s = hourly(72);
        assert_eq!(truncate_to_lookahead(&s, i64::MAX, day(10)).len(), 72);
        assert_eq!(truncate_to_lookahead(&s, 1_000_000_000, day(10)).len(), 72);
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let rows = build_hourly_view(&s, 1_000_000_000, epoch).unwrap();
        assert_eq!(rows.len(), 5 * 72);
    }

    #[test]
    fn unpivot_yields_m_times_t_rows() {
        let s = hourly(7);
        let names: Vec<&str> = s.columns().iter().map(|c| c.name.as_str()).collect();
        let rows = unpivot(&s, &names, HOURLY_VARIABLES).unwrap();
        assert_eq!(rows.len(), 6 * 7);
        assert_eq!(rows[0].measure, "Temp");
        assert_eq!(rows[0].time, at(10, 0));
        assert_eq!(rows[7].measure, "Relative Humidity");
        assert_eq!(rows[7].value, 1000.0);
        assert_eq!(rows.last().unwrap().value, 5006.0);
    }

    #[test]
    fn hourly_view_uses_five_measures() {
        let rows = build_hourly_view(&hourly(72), 2, day(10)).unwrap();
        assert_eq!(rows.len(), 5 * 48);
        assert!(!rows.iter().any(|r| r.measure == "Cloud Cover"));
    }

    #[test]
    fn unknown_measure_is_malformed() {
        let err = unpivot(&hourly(3), &["nope"], HOURLY_VARIABLES).unwrap_err();
        assert!(matches!(err, ForecastError::Malformed(_)));
    }
}
