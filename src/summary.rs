//! Plain-text current-conditions summary.

use crate::model::Snapshot;

/// Weather condition categories mapped from WMO codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// See https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }
}

fn fmt_value(v: Option<f64>, decimals: usize, unit: &str) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.decimals$}{unit}"),
        _ => "n/a".to_string(),
    }
}

/// One line per field, e.g. `Temperature: 71.3°F`.
pub fn current_summary(current: &Snapshot) -> String {
    let mut lines = vec![
        format!("As of: {}", current.time.format("%Y-%m-%d %H:%M")),
        format!("Temperature: {}", fmt_value(current.value("temperature_2m"), 1, "°F")),
        format!(
            "Relative Humidity: {}",
            fmt_value(current.value("relative_humidity_2m"), 1, "%")
        ),
        format!(
            "Apparent Temperature: {}",
            fmt_value(current.value("apparent_temperature"), 1, "°F")
        ),
        format!(
            "Precipitation: {}",
            fmt_value(current.value("precipitation"), 2, " inches")
        ),
        format!("Rain: {}", fmt_value(current.value("rain"), 2, " inches")),
        format!("Showers: {}", fmt_value(current.value("showers"), 2, " inches")),
        format!("Snow: {}", fmt_value(current.value("snowfall"), 2, " inches")),
    ];
    if let Some(code) = current.value("weather_code").filter(|c| c.is_finite()) {
        let condition = WeatherCondition::from_wmo_code(code as i32);
        let daylight = match current.value("is_day") {
            Some(d) if d >= 1.0 => " (day)",
            Some(d) if d == 0.0 => " (night)",
            _ => "",
        };
        lines.push(format!("Conditions: {}{daylight}", condition.description()));
    }
    lines.join("\n")
}
