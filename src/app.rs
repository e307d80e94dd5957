//! The display cycle: state in, trigger applied, state and panels out.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::forecast::ForecastFetcher;
use crate::location::{
    Acquisition, GeolocationBridge, GeolocationRequest, LocationSource, ManualLocation,
};
use crate::model::{Coordinate, ParsedForecast};
use crate::view::{ForecastView, build_view};

#[derive(Clone, Debug, PartialEq)]
pub enum LocationStatus {
    Idle,
    Waiting,
    Acquired(Coordinate),
    Unavailable(String),
}

impl std::fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Using entered coordinates"),
            Self::Waiting => write!(f, "Waiting for location…"),
            Self::Acquired(c) => write!(f, "Location acquired: {c}"),
            Self::Unavailable(why) => write!(f, "Location unavailable ({why}); using last known coordinates"),
        }
    }
}

/// Session state carried from one cycle to the next.
#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    pub coordinate: Coordinate,
    pub location: LocationStatus,
    pub forecast: Option<ParsedForecast>,
    pub last_error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            coordinate: Coordinate::DEFAULT,
            location: LocationStatus::Idle,
            forecast: None,
            last_error: None,
        }
    }
}

/// What woke the cycle up.
#[derive(Debug)]
pub enum Trigger {
    /// Nothing from the user; just look for late geolocation answers.
    Refresh,
    /// Manual coordinates were entered and submitted.
    Submit(ManualLocation),
    /// "Use my location" was pressed.
    RequestLocation,
    /// "Fetch weather" with the current coordinate.
    Fetch,
}

/// Result of one cycle.
#[derive(Debug)]
pub struct Cycle {
    pub state: AppState,
    /// Forecast panels; `None` when nothing was fetched or the fetch failed.
    pub view: Option<ForecastView>,
    /// A geolocation read the client side must now perform.
    pub outgoing: Option<GeolocationRequest>,
}

#[derive(Debug)]
pub struct Dashboard {
    fetcher: ForecastFetcher,
    bridge: GeolocationBridge,
    lookahead_days: i64,
}

impl Dashboard {
    pub fn new(fetcher: ForecastFetcher, bridge: GeolocationBridge, lookahead_days: i64) -> Self {
        Self {
            fetcher,
            bridge,
            lookahead_days,
        }
    }

    pub fn location_pending(&self) -> bool {
        self.bridge.is_pending()
    }

    pub async fn cycle(&mut self, mut state: AppState, trigger: Trigger) -> Cycle {
        let mut outgoing = None;
        let mut fetch = false;

        match trigger {
            Trigger::Refresh => {}
            Trigger::Fetch => fetch = true,
            Trigger::Submit(mut manual) => {
                if let Acquisition::Ready(c) = manual.acquire() {
                    state.coordinate = c;
                    state.location = LocationStatus::Idle;
                    fetch = true;
                }
            }
            Trigger::RequestLocation => {
                outgoing = self.bridge.request();
                state.location = LocationStatus::Waiting;
            }
        }

        match self.bridge.poll() {
            Some(Ok(c)) => {
                state.coordinate = c;
                state.location = LocationStatus::Acquired(c);
                fetch = true;
            }
            Some(Err(e)) => state.location = LocationStatus::Unavailable(e.to_string()),
            None if self.bridge.is_pending() => state.location = LocationStatus::Waiting,
            None => {}
        }

        if !fetch {
            return Cycle {
                state,
                view: None,
                outgoing,
            };
        }

        let view = self.fetch_into(&mut state).await;
        Cycle {
            state,
            view,
            outgoing,
        }
    }

    async fn fetch_into(&self, state: &mut AppState) -> Option<ForecastView> {
        state.forecast = None;
        let forecast = match self.fetcher.get_forecast(state.coordinate).await {
            Ok(f) => f,
            Err(e) => {
                warn!("forecast unavailable: {e}");
                state.last_error = Some(e.to_string());
                return None;
            }
        };
        let today = reference_date(&forecast);
        match build_view(&forecast, self.lookahead_days, today) {
            Ok(view) => {
                info!(
                    "view built: {} daily rows, {} hourly rows",
                    view.daily.len(),
                    view.hourly.len()
                );
                state.last_error = None;
                state.forecast = Some(forecast);
                Some(view)
            }
            Err(e) => {
                warn!("could not build forecast view: {e}");
                state.last_error = Some(e.to_string());
                None
            }
        }
    }
}

/// "Today" in the forecast's own timezone: the date of its current snapshot.
pub fn reference_date(forecast: &ParsedForecast) -> NaiveDate {
    forecast.current.time.date()
}
