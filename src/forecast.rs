//! Open‑Meteo forecast request building and response parsing.
//!
//! The provider returns one block per range (`current`, `hourly`, `daily`).
//! Values inside a block are bound to requested variables by position: the
//! Nth requested name takes the Nth value entry. The binding is checked, both
//! on count and on the key the provider echoes back, so a reordered or
//! truncated response fails instead of shifting a measure into the wrong
//! column.

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ForecastError;
use crate::http::CachedClient;
use crate::model::{Column, Coordinate, ParsedForecast, Series, Snapshot};

/// A provider variable and the label it is shown under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: &'static str,
    pub label: &'static str,
}

const fn var(name: &'static str, label: &'static str) -> Variable {
    Variable { name, label }
}

pub const CURRENT_VARIABLES: &[Variable] = &[
    var("temperature_2m", "Temperature"),
    var("relative_humidity_2m", "Relative Humidity"),
    var("apparent_temperature", "Apparent Temperature"),
    var("precipitation", "Precipitation"),
    var("rain", "Rain"),
    var("showers", "Showers"),
    var("snowfall", "Snow"),
    var("is_day", "Is Day"),
    var("weather_code", "Weather Code"),
];

pub const HOURLY_VARIABLES: &[Variable] = &[
    var("temperature_2m", "Temp"),
    var("relative_humidity_2m", "Relative Humidity"),
    var("dew_point_2m", "Dew Point"),
    var("apparent_temperature", "Apparent Temperature"),
    var("precipitation_probability", "Precipitation Probability"),
    var("cloud_cover", "Cloud Cover"),
];

pub const DAILY_VARIABLES: &[Variable] = &[
    var("temperature_2m_max", "Temp Max"),
    var("temperature_2m_min", "Temp Min"),
    var("apparent_temperature_max", "Apparent Temp Max"),
    var("apparent_temperature_min", "Apparent Temp Min"),
    var("sunrise", "Sunrise"),
    var("sunset", "Sunset"),
];

pub const DEFAULT_TIMEZONE: &str = "America/Chicago";
pub const DEFAULT_FORECAST_DAYS: u8 = 14;

/// Display label for a provider variable, falling back to the raw name.
pub fn label_for(variables: &[Variable], name: &str) -> String {
    variables
        .iter()
        .find(|v| v.name == name)
        .map(|v| v.label.to_string())
        .unwrap_or_else(|| name.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Units {
    pub temperature: &'static str,
    pub wind_speed: &'static str,
    pub precipitation: &'static str,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            temperature: "fahrenheit",
            wind_speed: "mph",
            precipitation: "inch",
        }
    }
}

/// Everything that goes into one provider call. Its URL is the cache key.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastRequest {
    pub coordinate: Coordinate,
    pub current: Vec<Variable>,
    pub hourly: Vec<Variable>,
    pub daily: Vec<Variable>,
    pub units: Units,
    pub timezone: String,
    pub forecast_days: u8,
}

impl ForecastRequest {
    pub fn new(coordinate: Coordinate, timezone: &str, forecast_days: u8) -> Self {
        Self {
            coordinate,
            current: CURRENT_VARIABLES.to_vec(),
            hourly: HOURLY_VARIABLES.to_vec(),
            daily: DAILY_VARIABLES.to_vec(),
            units: Units::default(),
            timezone: timezone.to_string(),
            forecast_days,
        }
    }

    /// Full request URL. Parameter order is fixed, so equal requests give equal URLs.
    pub fn url(&self, base: &str) -> String {
        fn names(vars: &[Variable]) -> String {
            vars.iter().map(|v| v.name).collect::<Vec<_>>().join(",")
        }
        format!(
            "{}/forecast?latitude={}&longitude={}&current={}&hourly={}&daily={}&temperature_unit={}&wind_speed_unit={}&precipitation_unit={}&timezone={}&forecast_days={}&timeformat=unixtime",
            base.trim_end_matches('/'),
            self.coordinate.latitude(),
            self.coordinate.longitude(),
            names(&self.current),
            names(&self.hourly),
            names(&self.daily),
            self.units.temperature,
            self.units.wind_speed,
            self.units.precipitation,
            urlencoding::encode(&self.timezone),
            self.forecast_days,
        )
    }
}

/// Builds requests for a coordinate and turns responses into `ParsedForecast`s.
#[derive(Debug, Clone)]
pub struct ForecastFetcher {
    client: CachedClient,
    base_url: String,
    timezone: String,
    forecast_days: u8,
}

impl ForecastFetcher {
    pub fn new(client: CachedClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_forecast_days(mut self, days: u8) -> Self {
        self.forecast_days = days;
        self
    }

    pub fn request_for(&self, coordinate: Coordinate) -> ForecastRequest {
        ForecastRequest::new(coordinate, &self.timezone, self.forecast_days)
    }

    pub async fn get_forecast(&self, coordinate: Coordinate) -> Result<ParsedForecast, ForecastError> {
        let request = self.request_for(coordinate);
        let url = request.url(&self.base_url);
        info!("fetching forecast for {coordinate}");
        let body = self.client.fetch(&url).await?;
        parse_forecast(&request, &body)
    }
}

/// Parse a raw provider response for `request`. All ranges parse or none do.
pub fn parse_forecast(request: &ForecastRequest, body: &[u8]) -> Result<ParsedForecast, ForecastError> {
    let root: Value = serde_json::from_slice(body)
        .map_err(|e| ForecastError::malformed(format!("response is not JSON: {e}")))?;
    let root = root
        .as_object()
        .ok_or_else(|| ForecastError::malformed("response is not a JSON object"))?;

    if let Some(true) = root.get("error").and_then(Value::as_bool) {
        let reason = root
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("unspecified");
        return Err(ForecastError::malformed(format!("provider error: {reason}")));
    }

    let utc_offset_seconds = match root.get("utc_offset_seconds") {
        None => 0,
        Some(v) => v
            .as_i64()
            .and_then(|o| i32::try_from(o).ok())
            .ok_or_else(|| ForecastError::malformed(format!("utc_offset_seconds {v} out of range")))?,
    };
    let timezone = root
        .get("timezone")
        .and_then(Value::as_str)
        .map(str::to_string);

    let current = parse_current(block(root, "current")?, &request.current, utc_offset_seconds)?;
    let hourly = parse_series(block(root, "hourly")?, "hourly", &request.hourly, utc_offset_seconds)?;
    let daily = parse_series(block(root, "daily")?, "daily", &request.daily, utc_offset_seconds)?;

    debug!(
        "parsed forecast: {} hourly points, {} daily points",
        hourly.len(),
        daily.len()
    );
    Ok(ParsedForecast {
        utc_offset_seconds,
        timezone,
        current,
        hourly,
        daily,
    })
}

fn block<'a>(root: &'a Map<String, Value>, range: &str) -> Result<&'a Map<String, Value>, ForecastError> {
    root.get(range)
        .and_then(Value::as_object)
        .ok_or_else(|| ForecastError::malformed(format!("missing '{range}' block")))
}

fn local_time(unix: i64, utc_offset_seconds: i32) -> Result<NaiveDateTime, ForecastError> {
    unix.checked_add(i64::from(utc_offset_seconds))
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| ForecastError::malformed(format!("timestamp {unix} out of range")))
}

/// Value entries of a block in document order, skipping the time metadata.
fn value_entries(block: &Map<String, Value>) -> Vec<(&str, &Value)> {
    block
        .iter()
        .filter(|(k, _)| k.as_str() != "time" && k.as_str() != "interval")
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

/// Zip requested variables with returned entries, checking count and echoed names.
fn bind<'a>(
    range: &str,
    requested: &[Variable],
    entries: Vec<(&'a str, &'a Value)>,
) -> Result<Vec<(Variable, &'a Value)>, ForecastError> {
    if entries.len() != requested.len() {
        return Err(ForecastError::malformed(format!(
            "{range}: requested {} variables, response returned {}",
            requested.len(),
            entries.len()
        )));
    }
    requested
        .iter()
        .zip(entries)
        .enumerate()
        .map(|(i, (var, (key, value)))| {
            if key != var.name {
                return Err(ForecastError::malformed(format!(
                    "{range}: position {i} holds '{key}', expected '{}'",
                    var.name
                )));
            }
            Ok((*var, value))
        })
        .collect()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(f64::NAN),
        other => other.as_f64(),
    }
}

fn parse_current(
    block: &Map<String, Value>,
    requested: &[Variable],
    utc_offset_seconds: i32,
) -> Result<Snapshot, ForecastError> {
    let time = block
        .get("time")
        .and_then(Value::as_i64)
        .ok_or_else(|| ForecastError::malformed("current: missing time"))?;
    let interval_seconds = block.get("interval").and_then(Value::as_i64).unwrap_or(0);

    let values = bind("current", requested, value_entries(block))?
        .into_iter()
        .map(|(var, value)| {
            number(value)
                .map(|v| (var.name.to_string(), v))
                .ok_or_else(|| ForecastError::malformed(format!("current: '{}' is not a number", var.name)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        time: local_time(time, utc_offset_seconds)?,
        interval_seconds,
        values,
    })
}

fn parse_series(
    block: &Map<String, Value>,
    range: &str,
    requested: &[Variable],
    utc_offset_seconds: i32,
) -> Result<Series, ForecastError> {
    let times = block
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| ForecastError::malformed(format!("{range}: missing time array")))?
        .iter()
        .map(|t| {
            t.as_i64()
                .ok_or_else(|| ForecastError::malformed(format!("{range}: non-integer time {t}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let interval = match times.as_slice() {
        [a, b, ..] => b.checked_sub(*a).unwrap_or(0),
        _ => default_interval(range),
    };
    if interval <= 0 || times.windows(2).any(|w| w[1].checked_sub(w[0]) != Some(interval)) {
        return Err(ForecastError::malformed(format!(
            "{range}: time grid is not regular"
        )));
    }

    let columns = bind(range, requested, value_entries(block))?
        .into_iter()
        .map(|(var, value)| -> Result<Column, ForecastError> {
            let values = value
                .as_array()
                .ok_or_else(|| ForecastError::malformed(format!("{range}: '{}' is not an array", var.name)))?
                .iter()
                .map(|v| {
                    number(v).ok_or_else(|| {
                        ForecastError::malformed(format!("{range}: '{}' holds non-numeric {v}", var.name))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Column {
                name: var.name.to_string(),
                values,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let first = times.first().copied().unwrap_or(0);
    let start = local_time(first, utc_offset_seconds)?;
    let end = i64::try_from(times.len())
        .ok()
        .and_then(|n| interval.checked_mul(n))
        .and_then(TimeDelta::try_seconds)
        .and_then(|span| start.checked_add_signed(span))
        .ok_or_else(|| ForecastError::malformed(format!("{range}: time grid runs past representable dates")))?;
    Series::new(start, end, interval, columns).map_err(|e| match e {
        ForecastError::Malformed(msg) => ForecastError::Malformed(format!("{range}: {msg}")),
        other => other,
    })
}

fn default_interval(range: &str) -> i64 {
    if range == "daily" { 86_400 } else { 3_600 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nashville() -> Coordinate {
        Coordinate::new(36.1676029, -86.8521476).unwrap()
    }

    #[test]
    fn url_lists_variables_in_request_order() {
        let req = ForecastRequest::new(nashville(), "America/Chicago", 14);
        let url = req.url("https://api.open-meteo.com/v1/");
        assert!(url.starts_with("https://api.open-meteo.com/v1/forecast?latitude=36.1676029&longitude=-86.8521476"));
        assert!(url.contains("&daily=temperature_2m_max,temperature_2m_min,apparent_temperature_max,apparent_temperature_min,sunrise,sunset&"));
        assert!(url.contains("&temperature_unit=fahrenheit&wind_speed_unit=mph&precipitation_unit=inch"));
        assert!(url.contains("&timezone=America%2FChicago&forecast_days=14"));
    }

    #[test]
    fn urls_differ_when_one_variable_differs() {
        let a = ForecastRequest::new(nashville(), "America/Chicago", 14);
        let mut b = a.clone();
        b.hourly.pop();
        assert_ne!(a.url("http://x"), b.url("http://x"));
    }

    #[test]
    fn bind_rejects_count_mismatch() {
        let vals = [Value::from(1.0)];
        let err = bind("current", CURRENT_VARIABLES, vec![("temperature_2m", &vals[0])]).unwrap_err();
        assert!(err.to_string().contains("requested 9 variables, response returned 1"));
    }

    #[test]
    fn bind_rejects_swapped_names() {
        let vars = [var("a", "A"), var("b", "B")];
        let vals = [Value::from(1.0), Value::from(2.0)];
        let err = bind("hourly", &vars, vec![("b", &vals[0]), ("a", &vals[1])]).unwrap_err();
        assert!(err.to_string().contains("position 0 holds 'b', expected 'a'"));
    }

    #[test]
    fn nulls_become_nan() {
        assert!(number(&Value::Null).unwrap().is_nan());
        assert_eq!(number(&Value::from(3)), Some(3.0));
        assert_eq!(number(&Value::from("x")), None);
    }

    #[test]
    fn label_lookup() {
        assert_eq!(label_for(HOURLY_VARIABLES, "dew_point_2m"), "Dew Point");
        assert_eq!(label_for(HOURLY_VARIABLES, "unknown"), "unknown");
    }
}
