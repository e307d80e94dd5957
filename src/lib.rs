//! Forecast Dash
//!
//! Fetches an Open‑Meteo forecast for a coordinate (entered by hand or relayed
//! from a one-shot geolocation read), caches the raw response on disk, and
//! turns it into a current-conditions summary plus daily and hourly line
//! charts.
//!
//! The binary crate builds `Settings` from its arguments and calls `run`.

pub mod app;
pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod forecast;
pub mod http;
pub mod location;
pub mod model;
pub mod retry;
pub mod summary;
pub mod view;

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

pub use app::{AppState, Cycle, Dashboard, LocationStatus, Trigger};
pub use cache::ResponseCache;
pub use config::{ChartFormat, Settings};
pub use error::{FetchError, ForecastError, LocationError};
pub use forecast::{ForecastFetcher, ForecastRequest, parse_forecast};
pub use http::CachedClient;
pub use location::{GeolocationBridge, GeolocationMessage, GeolocationRequest, ManualLocation};
pub use model::{Coordinate, LongFormRow, ParsedForecast, Series, Snapshot};
pub use view::{ForecastView, build_daily_view, build_hourly_view, build_view};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Where the coordinate comes from for a run.
#[derive(Debug)]
pub enum LocationInput {
    Manual(ManualLocation),
    /// One geolocation message (JSON) read from stdin.
    Stdin,
}

/// Build the dashboard described by `settings`. An unusable cache directory
/// only disables caching.
pub fn build_dashboard(settings: &Settings) -> Result<Dashboard> {
    let cache = match &settings.cache_dir {
        Some(dir) => {
            let ttl = chrono::Duration::from_std(settings.cache_ttl).context("cache TTL out of range")?;
            match ResponseCache::open(dir, ttl) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!("cache directory {} unusable, fetching live: {e}", dir.display());
                    None
                }
            }
        }
        None => None,
    };
    let client = CachedClient::new(cache, settings.retry.clone(), settings.http_timeout)?;
    let fetcher = ForecastFetcher::new(client, settings.forecast_base.clone())
        .with_timezone(settings.timezone.clone())
        .with_forecast_days(settings.forecast_days);
    let bridge = GeolocationBridge::new(Coordinate::DEFAULT, settings.geolocation_timeout);
    Ok(Dashboard::new(fetcher, bridge, settings.lookahead_days))
}

/// Answer a geolocation request from the first line of stdin.
fn answer_from_stdin(request: GeolocationRequest) {
    std::thread::spawn(move || {
        let mut line = String::new();
        let message = match std::io::stdin().read_line(&mut line) {
            Ok(0) => Err("no geolocation message on stdin".to_string()),
            Ok(_) => GeolocationMessage::parse(&line).map_err(|e| e.to_string()),
            Err(e) => Err(format!("stdin unreadable: {e}")),
        };
        let message = message.unwrap_or_else(|why| GeolocationMessage::Error {
            error: location::GeolocationFailure {
                code: 2,
                message: why,
            },
        });
        request.respond(message);
    });
}

pub async fn run(settings: &Settings, input: LocationInput) -> Result<()> {
    let mut dashboard = build_dashboard(settings)?;

    let first = match input {
        LocationInput::Manual(m) => Trigger::Submit(m),
        LocationInput::Stdin => Trigger::RequestLocation,
    };
    let mut cycle = dashboard.cycle(AppState::default(), first).await;
    if let Some(request) = cycle.outgoing.take() {
        answer_from_stdin(request);
    }
    while cycle.view.is_none() && dashboard.location_pending() {
        tokio::time::sleep(POLL_INTERVAL).await;
        cycle = dashboard.cycle(cycle.state, Trigger::Refresh).await;
    }
    if cycle.view.is_none() && cycle.state.last_error.is_none() {
        // Geolocation failed; show the forecast for the coordinate we still hold.
        cycle = dashboard.cycle(cycle.state, Trigger::Fetch).await;
    }

    let state = &cycle.state;
    println!("Location: {} ({})", state.coordinate, state.location);
    let view = cycle.view.ok_or_else(|| {
        anyhow!(
            "forecast unavailable: {}",
            state.last_error.as_deref().unwrap_or("unknown error")
        )
    })?;

    println!("\nCurrent Weather\n{}", view.summary);

    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("cannot create {}", settings.output_dir.display()))?;
    let ext = settings.chart_format.extension();
    for (name, layout, rows) in [
        ("daily", &chart::DAILY_CHART, &view.daily),
        ("hourly", &chart::HOURLY_CHART, &view.hourly),
    ] {
        let path = settings.output_dir.join(format!("{name}.{ext}"));
        chart::render_chart(&path, settings.chart_format, layout, rows)?;
        info!("wrote {} ({} rows)", path.display(), rows.len());
        println!("{}: {}", layout.title, path.display());
    }
    Ok(())
}
