//! Runtime settings and their defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::forecast::{DEFAULT_FORECAST_DAYS, DEFAULT_TIMEZONE};
use crate::location::DEFAULT_GEOLOCATION_TIMEOUT;
use crate::retry::RetryPolicy;
use crate::view::DEFAULT_LOOKAHEAD_DAYS;

pub const DEFAULT_CACHE_DIR: &str = ".cache";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Gets the base url for the forecast API
pub fn forecast_base() -> String {
    env::var("OPEN_METEO_FORECAST_BASE")
        .unwrap_or_else(|_| "https://api.open-meteo.com/v1".to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChartFormat {
    #[default]
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

impl std::str::FromStr for ChartFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            other => Err(format!("unknown chart format '{other}' (expected png or svg)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub forecast_base: String,
    /// `None` turns the response cache off.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    pub timezone: String,
    pub forecast_days: u8,
    pub lookahead_days: i64,
    pub geolocation_timeout: Duration,
    pub output_dir: PathBuf,
    pub chart_format: ChartFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            forecast_base: forecast_base(),
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            retry: RetryPolicy::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            timezone: DEFAULT_TIMEZONE.to_string(),
            forecast_days: DEFAULT_FORECAST_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            output_dir: PathBuf::from("."),
            chart_format: ChartFormat::Png,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_behaviour() {
        let s = Settings::default();
        assert_eq!(s.cache_ttl, Duration::from_secs(3600));
        assert_eq!(s.retry.max_retries, 5);
        assert_eq!(s.forecast_days, 14);
        assert_eq!(s.lookahead_days, 2);
        assert_eq!(s.timezone, "America/Chicago");
        assert_eq!(s.chart_format, ChartFormat::Png);
    }

    #[test]
    fn chart_format_parses() {
        assert_eq!("SVG".parse::<ChartFormat>(), Ok(ChartFormat::Svg));
        assert_eq!("png".parse::<ChartFormat>(), Ok(ChartFormat::Png));
        assert!("gif".parse::<ChartFormat>().is_err());
    }
}
