//! forecast-dash binary
//!
//! Parses arguments into `Settings`, installs logging, and invokes
//! `forecast_dash::run`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use forecast_dash::config::{self, ChartFormat, Settings};
use forecast_dash::{LocationInput, ManualLocation};
use tracing_subscriber::EnvFilter;

/// Open‑Meteo forecast dashboard: current conditions plus daily and hourly charts.
#[derive(Parser, Debug)]
#[command(name = "forecast-dash", version)]
struct Cli {
    /// Latitude in degrees (default 35)
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Longitude in degrees (default -85)
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Read one geolocation message from stdin instead of using --latitude/--longitude,
    /// e.g. {"latitude": 36.16, "longitude": -86.85}
    #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
    locate: bool,

    /// Seconds to wait for the geolocation message
    #[arg(long, default_value_t = 30)]
    locate_timeout_secs: u64,

    /// Timezone for the forecast's local times
    #[arg(long, default_value = "America/Chicago")]
    timezone: String,

    /// Days of hourly data to chart, counted from today (0 to 16)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(i64).range(0..=16))]
    lookahead_days: i64,

    /// Response cache directory
    #[arg(long, env = "FORECAST_DASH_CACHE_DIR", default_value = config::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Seconds a cached response stays fresh
    #[arg(long, default_value_t = config::DEFAULT_CACHE_TTL_SECS)]
    cache_ttl_secs: u64,

    /// Always go to the network
    #[arg(long)]
    no_cache: bool,

    /// Retries after a transient failure
    #[arg(long, default_value_t = forecast_dash::retry::DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Directory the charts are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Chart file format: png or svg
    #[arg(long, default_value = "png")]
    format: ChartFormat,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings {
            cache_dir: (!self.no_cache).then(|| self.cache_dir.clone()),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            timezone: self.timezone.clone(),
            lookahead_days: self.lookahead_days,
            geolocation_timeout: Duration::from_secs(self.locate_timeout_secs),
            output_dir: self.out_dir.clone(),
            chart_format: self.format,
            ..Settings::default()
        };
        settings.retry.max_retries = self.max_retries;
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    let input = if cli.locate {
        LocationInput::Stdin
    } else {
        LocationInput::Manual(ManualLocation::new(cli.latitude, cli.longitude)?)
    };
    forecast_dash::run(&settings, input).await
}
